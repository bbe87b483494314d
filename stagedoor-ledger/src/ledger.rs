use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::records::{InventoryRecord, Reservation, ReservationState};
use crate::store::{CasOutcome, LedgerStore, ReleaseScope};

/// Everything `reserve` needs to record a hold in one call. The coordinator
/// generates both ids up front so the hold is tagged with its owning booking
/// from the start.
#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub event_id: Uuid,
    pub seats: u32,
    pub reservation_id: Uuid,
    pub booking_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum ReserveOutcome {
    Applied(Reservation),
    /// The reservation id was seen before; the seat count was not touched.
    AlreadyApplied(Reservation),
}

#[derive(Debug)]
pub enum ReleaseOutcome {
    Released(Reservation),
    AlreadyReleased,
}

#[derive(Debug)]
pub enum ReclaimOutcome {
    Reclaimed(Reservation),
    AlreadyReleased,
    /// The hold was confirmed before the reaper got to it; the seats stay
    /// committed.
    ConfirmedMeanwhile,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("no inventory registered for event {0}")]
    EventNotFound(Uuid),

    #[error("reservation not found: {0}")]
    ReservationNotFound(Uuid),

    #[error("insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },

    #[error("seat count contention persisted after {attempts} attempts")]
    Contention { attempts: u32 },

    #[error("reservation already released: {0}")]
    AlreadyReleased(Uuid),

    #[error("inventory already registered for event {0}")]
    AlreadyRegistered(Uuid),

    #[error("event {0} still has outstanding holds")]
    OutstandingHolds(Uuid),

    #[error("ledger storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    fn storage(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

/// Owns the authoritative seat count per event. All mutation goes through
/// the reserve/release/confirm triple; concurrent writers for the same event
/// race only at the version-checked swap and the loser retries against the
/// freshly read state, so unrelated events never contend.
#[derive(Clone)]
pub struct SeatLedger {
    store: Arc<dyn LedgerStore>,
    max_cas_retries: u32,
}

impl SeatLedger {
    pub fn new(store: Arc<dyn LedgerStore>, max_cas_retries: u32) -> Self {
        Self {
            store,
            max_cas_retries: max_cas_retries.max(1),
        }
    }

    /// Create the inventory record alongside the catalog event, with every
    /// seat available.
    pub async fn register_event(
        &self,
        event_id: Uuid,
        total_seats: u32,
    ) -> Result<InventoryRecord, LedgerError> {
        let record = InventoryRecord {
            event_id,
            total_seats,
            available_seats: total_seats,
            version: 0,
        };
        let inserted = self
            .store
            .insert_inventory(record.clone())
            .await
            .map_err(LedgerError::storage)?;
        if !inserted {
            return Err(LedgerError::AlreadyRegistered(event_id));
        }
        Ok(record)
    }

    /// Remove the inventory record. Only legal once every hold has been
    /// released, i.e. the full seat count is available again.
    pub async fn retire_event(&self, event_id: Uuid) -> Result<(), LedgerError> {
        let record = self.availability(event_id).await?;
        if record.available_seats != record.total_seats {
            return Err(LedgerError::OutstandingHolds(event_id));
        }
        self.store
            .remove_inventory(event_id)
            .await
            .map_err(LedgerError::storage)?;
        Ok(())
    }

    pub async fn availability(&self, event_id: Uuid) -> Result<InventoryRecord, LedgerError> {
        self.store
            .load_inventory(event_id)
            .await
            .map_err(LedgerError::storage)?
            .ok_or(LedgerError::EventNotFound(event_id))
    }

    pub async fn reservation(&self, reservation_id: Uuid) -> Result<Reservation, LedgerError> {
        self.store
            .load_reservation(reservation_id)
            .await
            .map_err(LedgerError::storage)?
            .ok_or(LedgerError::ReservationNotFound(reservation_id))
    }

    /// Atomically decrement the event's available seats and record the hold.
    ///
    /// The reservation row is inserted if-absent *before* the seat decrement,
    /// so two concurrent calls with the same reservation id cannot both reach
    /// the decrement: the second observes the row and returns
    /// `AlreadyApplied`. If the decrement then fails the row is deleted
    /// again, leaving no trace of the attempt.
    pub async fn reserve(&self, req: ReserveRequest) -> Result<ReserveOutcome, LedgerError> {
        let reservation = Reservation {
            id: req.reservation_id,
            event_id: req.event_id,
            booking_id: req.booking_id,
            seats: req.seats,
            state: ReservationState::Held,
            created_at: Utc::now(),
            expires_at: req.expires_at,
        };

        if let Some(existing) = self
            .store
            .insert_reservation_if_absent(reservation.clone())
            .await
            .map_err(LedgerError::storage)?
        {
            debug!(reservation_id = %req.reservation_id, "reserve replayed, hold already applied");
            return Ok(ReserveOutcome::AlreadyApplied(existing));
        }

        match self.decrement(req.event_id, req.seats).await {
            Ok(()) => Ok(ReserveOutcome::Applied(reservation)),
            Err(err) => {
                // The hold never took effect; drop the idempotency row so the
                // id can be retried once capacity frees up.
                if let Err(delete_err) = self.store.delete_reservation(req.reservation_id).await {
                    warn!(reservation_id = %req.reservation_id, error = %delete_err,
                        "failed to delete reservation row after refused reserve");
                }
                Err(err)
            }
        }
    }

    /// Give the held seats back. Idempotent: the state flip in the store is
    /// the serialization point, so of two racing releases exactly one credits
    /// the seat count and the other observes `AlreadyReleased`.
    pub async fn release(&self, reservation_id: Uuid) -> Result<ReleaseOutcome, LedgerError> {
        let prior = self
            .store
            .mark_released(reservation_id, ReleaseScope::Any)
            .await
            .map_err(LedgerError::storage)?
            .ok_or(LedgerError::ReservationNotFound(reservation_id))?;

        match prior.state {
            ReservationState::Released => Ok(ReleaseOutcome::AlreadyReleased),
            ReservationState::Held | ReservationState::Confirmed => {
                if let Err(err) = self.credit(prior.event_id, prior.seats).await {
                    self.reinstate(&prior).await;
                    return Err(err);
                }
                let mut released = prior;
                released.state = ReservationState::Released;
                Ok(ReleaseOutcome::Released(released))
            }
        }
    }

    /// Reaper-side release: takes seats back only from an unconfirmed hold.
    /// A hold that was confirmed after the sweep selected it is reported as
    /// such and left untouched.
    pub async fn reclaim(&self, reservation_id: Uuid) -> Result<ReclaimOutcome, LedgerError> {
        let prior = self
            .store
            .mark_released(reservation_id, ReleaseScope::HeldOnly)
            .await
            .map_err(LedgerError::storage)?
            .ok_or(LedgerError::ReservationNotFound(reservation_id))?;

        match prior.state {
            ReservationState::Released => Ok(ReclaimOutcome::AlreadyReleased),
            ReservationState::Confirmed => Ok(ReclaimOutcome::ConfirmedMeanwhile),
            ReservationState::Held => {
                if let Err(err) = self.credit(prior.event_id, prior.seats).await {
                    self.reinstate(&prior).await;
                    return Err(err);
                }
                let mut released = prior;
                released.state = ReservationState::Released;
                Ok(ReclaimOutcome::Reclaimed(released))
            }
        }
    }

    /// Mark a held reservation confirmed. The seat count is untouched (seats
    /// were decremented at reserve time); confirmation only removes the hold
    /// from the expiry-reclaim pool. Confirming twice is a no-op.
    pub async fn confirm(&self, reservation_id: Uuid) -> Result<Reservation, LedgerError> {
        let prior = self
            .store
            .mark_confirmed(reservation_id)
            .await
            .map_err(LedgerError::storage)?
            .ok_or(LedgerError::ReservationNotFound(reservation_id))?;

        match prior.state {
            ReservationState::Released => Err(LedgerError::AlreadyReleased(reservation_id)),
            ReservationState::Held | ReservationState::Confirmed => {
                let mut confirmed = prior;
                confirmed.state = ReservationState::Confirmed;
                Ok(confirmed)
            }
        }
    }

    /// Read-modify-write loop for the seat decrement: read `(available,
    /// version)`, fail fast when the request cannot fit, otherwise write the
    /// new count conditioned on the version being unchanged. Bounded so a
    /// pathological interleaving surfaces `Contention` instead of spinning.
    async fn decrement(&self, event_id: Uuid, seats: u32) -> Result<(), LedgerError> {
        for attempt in 0..self.max_cas_retries {
            let record = self.availability(event_id).await?;
            if seats > record.available_seats {
                return Err(LedgerError::InsufficientInventory {
                    requested: seats,
                    available: record.available_seats,
                });
            }
            match self
                .store
                .compare_and_swap_available(
                    event_id,
                    record.version,
                    record.available_seats - seats,
                )
                .await
                .map_err(LedgerError::storage)?
            {
                CasOutcome::Swapped => return Ok(()),
                CasOutcome::VersionMismatch => {
                    debug!(%event_id, attempt, "seat count moved underneath us, retrying");
                }
                CasOutcome::Missing => return Err(LedgerError::EventNotFound(event_id)),
            }
        }
        Err(LedgerError::Contention {
            attempts: self.max_cas_retries,
        })
    }

    /// Credit released seats back, clamped at `total_seats`: a stray row
    /// with no backing decrement must never push availability past the
    /// house size.
    async fn credit(&self, event_id: Uuid, seats: u32) -> Result<(), LedgerError> {
        for attempt in 0..self.max_cas_retries {
            let record = self.availability(event_id).await?;
            let restored = record
                .available_seats
                .saturating_add(seats)
                .min(record.total_seats);
            if restored != record.available_seats.saturating_add(seats) {
                warn!(%event_id, seats, available = record.available_seats,
                    total = record.total_seats, "seat credit clamped at total");
            }
            match self
                .store
                .compare_and_swap_available(event_id, record.version, restored)
                .await
                .map_err(LedgerError::storage)?
            {
                CasOutcome::Swapped => return Ok(()),
                CasOutcome::VersionMismatch => {
                    debug!(%event_id, attempt, "seat count moved underneath us, retrying");
                }
                CasOutcome::Missing => return Err(LedgerError::EventNotFound(event_id)),
            }
        }
        Err(LedgerError::Contention {
            attempts: self.max_cas_retries,
        })
    }

    /// Undo a state flip whose seat credit did not land. The flip's winner is
    /// the only caller that can reach this, so putting the prior state back
    /// cannot race another release.
    async fn reinstate(&self, prior: &Reservation) {
        if let Err(err) = self
            .store
            .reinstate_reservation(prior.id, prior.state)
            .await
        {
            error!(reservation_id = %prior.id, error = %err,
                "failed to reinstate reservation after credit failure");
        }
    }
}
