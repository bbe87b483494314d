pub mod coordinator;
pub mod reaper;

pub use coordinator::{Coordinator, CoordinatorError, RequestBooking};
pub use reaper::Reaper;
