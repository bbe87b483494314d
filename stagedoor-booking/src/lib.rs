pub mod machine;
pub mod memory;
pub mod model;
pub mod store;

pub use machine::TransitionError;
pub use memory::MemoryBookingStore;
pub use model::{Booking, BookingStatus};
pub use store::{BookingStore, StatusSwap};
