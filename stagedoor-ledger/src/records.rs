use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authoritative seat-count record for one event. `version` is bumped on
/// every successful seat-count write and is the optimistic-concurrency
/// check for the ledger's compare-and-swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub event_id: Uuid,
    pub total_seats: u32,
    pub available_seats: u32,
    pub version: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationState {
    Held,
    Confirmed,
    Released,
}

/// A block of seats held against an event. The id doubles as the ledger's
/// idempotency key: replaying `reserve` with an id that was already applied
/// must not decrement the seat count a second time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub booking_id: Uuid,
    pub seats: u32,
    pub state: ReservationState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
