use crate::model::{Booking, BookingStatus};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("illegal booking transition from {from} to {to}")]
    IllegalTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
}

impl Booking {
    /// Apply a status transition, enforcing the legal-transition table. An
    /// illegal attempt leaves the booking unchanged.
    pub fn transition(&mut self, to: BookingStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition(to) {
            return Err(TransitionError::IllegalTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
