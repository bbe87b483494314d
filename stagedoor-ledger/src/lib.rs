pub mod ledger;
pub mod memory;
pub mod records;
pub mod store;

pub use ledger::{
    LedgerError, ReclaimOutcome, ReleaseOutcome, ReserveOutcome, ReserveRequest, SeatLedger,
};
pub use memory::MemoryLedgerStore;
pub use records::{InventoryRecord, Reservation, ReservationState};
pub use store::{CasOutcome, LedgerStore, ReleaseScope};
