use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{Booking, BookingStatus};

pub type StoreResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Result of a compare-and-set status change.
#[derive(Debug, Clone)]
pub enum StatusSwap {
    /// The row was in the expected status and now carries the new one.
    Applied(Booking),
    /// The row had already moved; returned unchanged so the caller can see
    /// who won the race.
    Stale(Booking),
}

/// Storage seam for bookings. `transition` is a compare-and-set on the
/// status column so racing actors (user cancel vs. reaper expiry) serialize
/// in the store and the first terminal state to land wins.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: Booking) -> StoreResult<()>;

    async fn get(&self, booking_id: Uuid) -> StoreResult<Option<Booking>>;

    async fn find_by_reservation(&self, reservation_id: Uuid) -> StoreResult<Option<Booking>>;

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>>;

    async fn list_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Booking>>;

    async fn transition(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Option<StatusSwap>>;

    /// Pending bookings whose hold deadline has passed.
    async fn expired_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<Booking>>;
}
