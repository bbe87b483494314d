use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    /// The legal transition table for the booking lifecycle. A confirmed
    /// booking may still be cancelled; cancelled and expired are final.
    pub fn can_transition(self, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed) | (Pending, Cancelled) | (Pending, Expired) | (Confirmed, Cancelled)
        )
    }

    /// True once no further transition is accepted from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Expired)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// A booking row. Never physically deleted; terminal statuses are the audit
/// trail. `reservation_id` is a foreign reference to the hold in the ledger,
/// not ownership: the reservation's lifetime is the ledger's business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub seats: u32,
    pub status: BookingStatus,
    pub reservation_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Booking {
    pub fn pending(
        id: Uuid,
        user_id: Uuid,
        event_id: Uuid,
        seats: u32,
        reservation_id: Uuid,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            event_id,
            seats,
            status: BookingStatus::Pending,
            reservation_id,
            created_at,
            expires_at,
        }
    }
}
