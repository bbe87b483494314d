use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stagedoor_booking::Booking;
use stagedoor_coordinator::RequestBooking;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    user_id: Uuid,
    event_id: Uuid,
    seats: u32,
    idempotency_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking_id: Uuid,
    status: String,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id,
            status: booking.status.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BookingView {
    booking_id: Uuid,
    user_id: Uuid,
    event_id: Uuid,
    seats: u32,
    status: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.id,
            user_id: booking.user_id,
            event_id: booking.event_id,
            seats: booking.seats,
            status: booking.status.to_string(),
            created_at: booking.created_at,
            expires_at: booking.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    user_id: Option<Uuid>,
    event_id: Option<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/confirm", post(confirm_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = state
        .coordinator
        .request_booking(RequestBooking {
            user_id: req.user_id,
            event_id: req.event_id,
            seats: req.seats,
            idempotency_key: req.idempotency_key,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(&booking))))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.coordinator.confirm_booking(id).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.coordinator.cancel_booking(id).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    let booking = state.coordinator.booking(id).await?;
    Ok(Json(BookingView::from(booking)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let bookings = match (params.user_id, params.event_id) {
        (Some(user_id), None) => state.coordinator.bookings_for_user(user_id).await?,
        (None, Some(event_id)) => state.coordinator.bookings_for_event(event_id).await?,
        _ => {
            return Err(AppError::Validation(
                "provide exactly one of user_id or event_id".into(),
            ))
        }
    };
    Ok(Json(bookings.into_iter().map(BookingView::from).collect()))
}
