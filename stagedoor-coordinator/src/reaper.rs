use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use stagedoor_booking::{Booking, BookingStatus, BookingStore, StatusSwap};
use stagedoor_ledger::{LedgerError, ReclaimOutcome, SeatLedger};

use crate::coordinator::CoordinatorError;

/// Background sweep reclaiming seats held by bookings that were never
/// confirmed within their deadline. Each booking is processed independently;
/// a failure is logged and retried on the next cycle, never fatal.
pub struct Reaper {
    ledger: SeatLedger,
    bookings: Arc<dyn BookingStore>,
    interval: Duration,
}

impl Reaper {
    pub fn new(ledger: SeatLedger, bookings: Arc<dyn BookingStore>, interval: Duration) -> Self {
        Self {
            ledger,
            bookings,
            interval,
        }
    }

    /// Sweep forever on the configured interval.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "expiry reaper started");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(0) => {}
                Ok(expired) => info!(expired, "reaper reclaimed overdue holds"),
                Err(err) => error!(error = %err, "reaper sweep failed"),
            }
        }
    }

    /// One pass: expire every pending booking past its deadline. Returns the
    /// number of bookings transitioned to `EXPIRED`.
    pub async fn sweep_once(&self) -> Result<usize, CoordinatorError> {
        let overdue = self
            .bookings
            .expired_pending(Utc::now())
            .await
            .map_err(|err| CoordinatorError::Storage(err.to_string()))?;

        let mut expired = 0;
        for booking in overdue {
            match self.expire(&booking).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(booking_id = %booking.id, error = %err,
                        "failed to expire booking, will retry next sweep");
                }
            }
        }
        Ok(expired)
    }

    /// Release the hold, then flip the booking. Returns false when another
    /// actor got to the booking first; their terminal state stands.
    async fn expire(&self, booking: &Booking) -> Result<bool, CoordinatorError> {
        match self.ledger.reclaim(booking.reservation_id).await {
            Ok(ReclaimOutcome::Reclaimed(_)) | Ok(ReclaimOutcome::AlreadyReleased) => {}
            Ok(ReclaimOutcome::ConfirmedMeanwhile) => {
                // The client confirmed between the scan and the release; the
                // pending status is theirs to finish.
                debug!(booking_id = %booking.id, "hold confirmed before reclaim, skipping");
                return Ok(false);
            }
            Err(LedgerError::ReservationNotFound(_)) => {
                warn!(booking_id = %booking.id, reservation_id = %booking.reservation_id,
                    "expiring booking with no ledger reservation");
            }
            Err(err) => return Err(err.into()),
        }

        match self
            .bookings
            .transition(booking.id, BookingStatus::Pending, BookingStatus::Expired)
            .await
            .map_err(|err| CoordinatorError::Storage(err.to_string()))?
        {
            Some(StatusSwap::Applied(_)) => {
                info!(booking_id = %booking.id, "booking expired, seats reclaimed");
                Ok(true)
            }
            Some(StatusSwap::Stale(_)) | None => Ok(false),
        }
    }
}
