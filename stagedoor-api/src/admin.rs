use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use stagedoor_core::EventSummary;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct RegisterEventRequest {
    event_id: Option<Uuid>,
    total_seats: u32,
    event_date_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct RegisterEventResponse {
    event_id: Uuid,
    total_seats: u32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/events", post(register_event))
        .route("/v1/admin/events/{id}", delete(retire_event))
}

/// Seed an event: the inventory record is created alongside the catalog
/// entry, with every seat available.
async fn register_event(
    State(state): State<AppState>,
    Json(req): Json<RegisterEventRequest>,
) -> Result<(StatusCode, Json<RegisterEventResponse>), AppError> {
    if req.total_seats == 0 {
        return Err(AppError::Validation("total_seats must be at least 1".into()));
    }

    let event_id = req.event_id.unwrap_or_else(Uuid::new_v4);
    let record = state.ledger.register_event(event_id, req.total_seats).await?;
    state.catalog.insert(EventSummary {
        event_id,
        total_seats: req.total_seats,
        event_date_time: req.event_date_time,
    });

    info!(%event_id, total_seats = req.total_seats, "event registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterEventResponse {
            event_id,
            total_seats: record.total_seats,
        }),
    ))
}

/// Retire an event. Refused while any hold is outstanding, so seats can
/// never vanish out from under a live reservation.
async fn retire_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.ledger.retire_event(id).await?;
    state.catalog.remove(id);
    info!(event_id = %id, "event retired");
    Ok(StatusCode::NO_CONTENT)
}
