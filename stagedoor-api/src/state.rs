use std::sync::Arc;

use stagedoor_coordinator::Coordinator;
use stagedoor_ledger::SeatLedger;
use stagedoor_store::{MemoryEventCatalog, MemoryUserDirectory};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub ledger: SeatLedger,
    pub catalog: Arc<MemoryEventCatalog>,
    pub directory: Arc<MemoryUserDirectory>,
}
