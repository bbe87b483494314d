use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use stagedoor_booking::{Booking, BookingStatus, BookingStore, StatusSwap};
use stagedoor_core::{EventCatalog, UserDirectory};
use stagedoor_ledger::{
    LedgerError, ReleaseOutcome, Reservation, ReservationState, ReserveOutcome, ReserveRequest,
    SeatLedger,
};

/// Namespace for reservation ids derived from client idempotency keys, so a
/// replayed request maps onto the same hold.
const RESERVATION_NAMESPACE: Uuid = Uuid::from_u128(0x8c9f_2a41_7d5e_4b06_9e33_51c8a0d47f12);

#[derive(Debug, Clone)]
pub struct RequestBooking {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub seats: u32,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },

    #[error("booking not found: {0}")]
    NotFound(Uuid),

    #[error("booking {0} is already in a terminal state")]
    AlreadyTerminal(Uuid),

    #[error("illegal booking transition from {from} to {to}")]
    IllegalTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("transient contention, retry with backoff")]
    Contention,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl CoordinatorError {
    fn storage(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoordinatorError::Storage(err.to_string())
    }
}

impl From<LedgerError> for CoordinatorError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientInventory {
                requested,
                available,
            } => CoordinatorError::InsufficientInventory {
                requested,
                available,
            },
            LedgerError::Contention { .. } => CoordinatorError::Contention,
            LedgerError::EventNotFound(id) => {
                CoordinatorError::Validation(format!("no seat inventory for event {id}"))
            }
            other => CoordinatorError::Storage(other.to_string()),
        }
    }
}

/// Drives the reserve/confirm saga: a booking request becomes either a
/// confirmed booking or a fully rolled-back no-op. The ledger and the
/// booking store live in separate storage domains; consistency across them
/// comes from idempotency keys and compensating releases, not a shared
/// transaction.
pub struct Coordinator {
    ledger: SeatLedger,
    bookings: Arc<dyn BookingStore>,
    catalog: Arc<dyn EventCatalog>,
    directory: Arc<dyn UserDirectory>,
    hold_duration: Duration,
}

impl Coordinator {
    pub fn new(
        ledger: SeatLedger,
        bookings: Arc<dyn BookingStore>,
        catalog: Arc<dyn EventCatalog>,
        directory: Arc<dyn UserDirectory>,
        hold_duration: Duration,
    ) -> Self {
        Self {
            ledger,
            bookings,
            catalog,
            directory,
            hold_duration,
        }
    }

    pub fn ledger(&self) -> &SeatLedger {
        &self.ledger
    }

    /// Reserve seats and create the booking. On `InsufficientInventory` no
    /// booking row is ever created; on a booking-write failure the fresh
    /// hold is released again, so the caller never sees partial state.
    pub async fn request_booking(&self, req: RequestBooking) -> Result<Booking, CoordinatorError> {
        self.validate(&req).await?;

        let reservation_id = match &req.idempotency_key {
            Some(key) => Uuid::new_v5(&RESERVATION_NAMESPACE, key.as_bytes()),
            None => Uuid::new_v4(),
        };
        let booking_id = Uuid::new_v4();
        let now = Utc::now();
        let expires_at = now + self.hold_duration;

        let reservation = match self
            .ledger
            .reserve(ReserveRequest {
                event_id: req.event_id,
                seats: req.seats,
                reservation_id,
                booking_id,
                expires_at,
            })
            .await?
        {
            ReserveOutcome::Applied(reservation) => reservation,
            ReserveOutcome::AlreadyApplied(reservation) => {
                return self.resume_replayed(req, reservation).await;
            }
        };

        let booking = Booking::pending(
            booking_id,
            req.user_id,
            req.event_id,
            req.seats,
            reservation.id,
            now,
            expires_at,
        );
        if let Err(err) = self.bookings.insert(booking.clone()).await {
            // The booking never made it down; pull the hold back so the
            // seats are not stranded until the reaper notices.
            if let Err(release_err) = self.ledger.release(reservation_id).await {
                error!(
                    %reservation_id,
                    error = %release_err,
                    "compensating release failed, seats stay held until expiry"
                );
            }
            return Err(CoordinatorError::storage(err));
        }

        info!(%booking_id, %reservation_id, seats = req.seats, "booking created, seats held");
        Ok(self.confirm_inline(booking).await)
    }

    /// Client-driven confirmation retry for a booking whose inline
    /// confirmation did not land. Confirming a confirmed booking is a no-op.
    pub async fn confirm_booking(&self, booking_id: Uuid) -> Result<Booking, CoordinatorError> {
        let booking = self.load(booking_id).await?;
        match booking.status {
            BookingStatus::Confirmed => Ok(booking),
            BookingStatus::Cancelled | BookingStatus::Expired => {
                Err(CoordinatorError::AlreadyTerminal(booking_id))
            }
            BookingStatus::Pending => match self.ledger.confirm(booking.reservation_id).await {
                Ok(_) => self.settle_confirmed(&booking).await,
                Err(LedgerError::AlreadyReleased(_)) | Err(LedgerError::ReservationNotFound(_)) => {
                    // The reaper won the deadline race. Finish the expiry on
                    // the booking side so the two records converge.
                    let _ = self
                        .bookings
                        .transition(booking_id, BookingStatus::Pending, BookingStatus::Expired)
                        .await;
                    Err(CoordinatorError::AlreadyTerminal(booking_id))
                }
                Err(err) => Err(err.into()),
            },
        }
    }

    /// Cancel a pending or confirmed booking, releasing its seats. Tolerates
    /// the reservation already being released when the reaper raced us.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking, CoordinatorError> {
        let booking = self.load(booking_id).await?;
        if booking.status.is_terminal() {
            return Err(CoordinatorError::AlreadyTerminal(booking_id));
        }

        match self.ledger.release(booking.reservation_id).await {
            Ok(ReleaseOutcome::Released(_)) => {}
            Ok(ReleaseOutcome::AlreadyReleased) => {
                debug!(%booking_id, "hold already released, continuing cancel");
            }
            Err(LedgerError::ReservationNotFound(_)) => {
                warn!(%booking_id, reservation_id = %booking.reservation_id,
                    "cancelling booking with no ledger reservation");
            }
            Err(err) => return Err(err.into()),
        }

        // The booking may move underneath us (inline confirm, reaper); retry
        // the compare-and-set against the fresh status a couple of times and
        // let the first terminal state win.
        let mut current = booking;
        for _ in 0..3 {
            if current.status.is_terminal() {
                return Err(CoordinatorError::AlreadyTerminal(booking_id));
            }
            if !current.status.can_transition(BookingStatus::Cancelled) {
                return Err(CoordinatorError::IllegalTransition {
                    from: current.status,
                    to: BookingStatus::Cancelled,
                });
            }
            match self
                .bookings
                .transition(booking_id, current.status, BookingStatus::Cancelled)
                .await
                .map_err(CoordinatorError::storage)?
            {
                Some(StatusSwap::Applied(cancelled)) => {
                    info!(%booking_id, "booking cancelled, seats released");
                    return Ok(cancelled);
                }
                Some(StatusSwap::Stale(fresh)) => current = fresh,
                None => return Err(CoordinatorError::NotFound(booking_id)),
            }
        }
        Err(CoordinatorError::Contention)
    }

    pub async fn booking(&self, booking_id: Uuid) -> Result<Booking, CoordinatorError> {
        self.load(booking_id).await
    }

    pub async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, CoordinatorError> {
        self.bookings
            .list_for_user(user_id)
            .await
            .map_err(CoordinatorError::storage)
    }

    pub async fn bookings_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<Booking>, CoordinatorError> {
        self.bookings
            .list_for_event(event_id)
            .await
            .map_err(CoordinatorError::storage)
    }

    async fn validate(&self, req: &RequestBooking) -> Result<(), CoordinatorError> {
        if req.seats < 1 {
            return Err(CoordinatorError::Validation(
                "seat count must be at least 1".into(),
            ));
        }
        let known = self
            .directory
            .user_exists(req.user_id)
            .await
            .map_err(CoordinatorError::storage)?;
        if !known {
            return Err(CoordinatorError::Validation(format!(
                "unknown user {}",
                req.user_id
            )));
        }
        let event = self
            .catalog
            .get_event(req.event_id)
            .await
            .map_err(CoordinatorError::storage)?
            .ok_or_else(|| {
                CoordinatorError::Validation(format!("unknown event {}", req.event_id))
            })?;
        if event.event_date_time <= Utc::now() {
            return Err(CoordinatorError::Validation(format!(
                "event {} has already started",
                req.event_id
            )));
        }
        Ok(())
    }

    /// A replayed idempotency key landed on a hold that already exists.
    /// Normally its booking exists too and is simply returned; if the
    /// original request died between reserve and the booking write, the
    /// booking is recreated from the hold and the request finishes as usual.
    async fn resume_replayed(
        &self,
        req: RequestBooking,
        reservation: Reservation,
    ) -> Result<Booking, CoordinatorError> {
        if let Some(existing) = self
            .bookings
            .find_by_reservation(reservation.id)
            .await
            .map_err(CoordinatorError::storage)?
        {
            debug!(booking_id = %existing.id, reservation_id = %reservation.id,
                "idempotent replay, returning existing booking");
            return Ok(existing);
        }

        if reservation.state == ReservationState::Released {
            return Err(CoordinatorError::Validation(format!(
                "idempotency key refers to a released hold ({})",
                reservation.id
            )));
        }

        warn!(reservation_id = %reservation.id,
            "hold exists without a booking, recreating the booking row");
        let booking = Booking::pending(
            reservation.booking_id,
            req.user_id,
            reservation.event_id,
            reservation.seats,
            reservation.id,
            reservation.created_at,
            reservation.expires_at,
        );
        self.bookings
            .insert(booking.clone())
            .await
            .map_err(CoordinatorError::storage)?;
        Ok(self.confirm_inline(booking).await)
    }

    /// Confirmation is attempted inline but its failure is not the request's
    /// failure: the booking stays `PENDING` for a client-driven retry, and
    /// only the reaper enforces the deadline. Releasing the seats here would
    /// yank a hold the client may still complete.
    async fn confirm_inline(&self, booking: Booking) -> Booking {
        let booking_id = booking.id;
        match self.try_confirm(&booking).await {
            Ok(confirmed) => confirmed,
            Err(err) => {
                warn!(%booking_id, error = %err,
                    "inline confirmation failed, booking stays pending");
                booking
            }
        }
    }

    async fn try_confirm(&self, booking: &Booking) -> Result<Booking, CoordinatorError> {
        self.ledger.confirm(booking.reservation_id).await?;
        self.settle_confirmed(booking).await
    }

    async fn settle_confirmed(&self, booking: &Booking) -> Result<Booking, CoordinatorError> {
        match self
            .bookings
            .transition(booking.id, BookingStatus::Pending, BookingStatus::Confirmed)
            .await
            .map_err(CoordinatorError::storage)?
        {
            Some(StatusSwap::Applied(confirmed)) => {
                info!(booking_id = %booking.id, "booking confirmed");
                Ok(confirmed)
            }
            // Someone else already moved the row; report what is there now.
            Some(StatusSwap::Stale(current)) => Ok(current),
            None => Err(CoordinatorError::NotFound(booking.id)),
        }
    }

    async fn load(&self, booking_id: Uuid) -> Result<Booking, CoordinatorError> {
        self.bookings
            .get(booking_id)
            .await
            .map_err(CoordinatorError::storage)?
            .ok_or(CoordinatorError::NotFound(booking_id))
    }
}
