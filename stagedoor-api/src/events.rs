use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    event_id: Uuid,
    total_seats: u32,
    available_seats: u32,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/events/{id}/availability", get(get_availability))
}

/// Availability is served by the ledger, the authority on seat counts; the
/// catalog only knows the static total.
async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let record = state.ledger.availability(id).await?;
    Ok(Json(AvailabilityResponse {
        event_id: record.event_id,
        total_seats: record.total_seats,
        available_seats: record.available_seats,
    }))
}
