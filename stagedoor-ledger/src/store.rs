use async_trait::async_trait;
use uuid::Uuid;

use crate::records::{InventoryRecord, Reservation, ReservationState};

pub type StoreResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Outcome of a conditional seat-count write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Swapped,
    VersionMismatch,
    Missing,
}

/// Which reservation states a release may take seats back from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseScope {
    /// User- or ops-initiated cancel: a confirmed reservation may be undone.
    Any,
    /// Reaper reclaim: only an unconfirmed hold. A reservation that was
    /// confirmed in the meantime is left alone.
    HeldOnly,
}

/// Storage seam for the ledger. Implementations must make the version check
/// in `compare_and_swap_available` and the state flips in `mark_confirmed` /
/// `mark_released` atomic with respect to concurrent callers; the ledger
/// builds everything else out of those primitives.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load_inventory(&self, event_id: Uuid) -> StoreResult<Option<InventoryRecord>>;

    /// Returns false if a record for the event already exists.
    async fn insert_inventory(&self, record: InventoryRecord) -> StoreResult<bool>;

    async fn remove_inventory(&self, event_id: Uuid) -> StoreResult<bool>;

    /// Write `new_available` and bump the version, but only if the stored
    /// version still equals `expected_version`.
    async fn compare_and_swap_available(
        &self,
        event_id: Uuid,
        expected_version: u64,
        new_available: u32,
    ) -> StoreResult<CasOutcome>;

    async fn load_reservation(&self, reservation_id: Uuid) -> StoreResult<Option<Reservation>>;

    /// Insert unless a reservation with the same id exists; returns the
    /// existing row if it does.
    async fn insert_reservation_if_absent(
        &self,
        reservation: Reservation,
    ) -> StoreResult<Option<Reservation>>;

    async fn delete_reservation(&self, reservation_id: Uuid) -> StoreResult<bool>;

    /// Flip `Held -> Confirmed`; any other state is left unchanged. Returns
    /// the row as it was before the flip.
    async fn mark_confirmed(&self, reservation_id: Uuid) -> StoreResult<Option<Reservation>>;

    /// Flip to `Released` from the states allowed by `scope`; anything else
    /// is left unchanged. Returns the row as it was before the flip.
    async fn mark_released(
        &self,
        reservation_id: Uuid,
        scope: ReleaseScope,
    ) -> StoreResult<Option<Reservation>>;

    /// Put a `Released` row back to `state`. Undoes a release whose seat
    /// credit could not be applied, so a retry runs the release again
    /// instead of finding a row that looks settled.
    async fn reinstate_reservation(
        &self,
        reservation_id: Uuid,
        state: ReservationState,
    ) -> StoreResult<Option<Reservation>>;
}
