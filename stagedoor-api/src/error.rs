use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use stagedoor_coordinator::CoordinatorError;
use stagedoor_ledger::LedgerError;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    Contention,
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Contention => (
                StatusCode::SERVICE_UNAVAILABLE,
                "temporarily busy, retry with backoff".to_string(),
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoordinatorError> for AppError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::Validation(msg) => AppError::Validation(msg),
            CoordinatorError::NotFound(_) => AppError::NotFound(err.to_string()),
            CoordinatorError::InsufficientInventory { .. }
            | CoordinatorError::AlreadyTerminal(_)
            | CoordinatorError::IllegalTransition { .. } => AppError::Conflict(err.to_string()),
            CoordinatorError::Contention => AppError::Contention,
            CoordinatorError::Storage(msg) => AppError::Internal(msg),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::EventNotFound(_) | LedgerError::ReservationNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            LedgerError::InsufficientInventory { .. }
            | LedgerError::AlreadyRegistered(_)
            | LedgerError::OutstandingHolds(_)
            | LedgerError::AlreadyReleased(_) => AppError::Conflict(err.to_string()),
            LedgerError::Contention { .. } => AppError::Contention,
            LedgerError::Storage(msg) => AppError::Internal(msg),
        }
    }
}
