use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use stagedoor_core::{BoxError, EventCatalog, EventSummary, UserDirectory};

/// In-process stand-in for the event catalog service. The booking core only
/// ever reads from it; writes happen through the admin seeding surface.
#[derive(Default)]
pub struct MemoryEventCatalog {
    events: RwLock<HashMap<Uuid, EventSummary>>,
}

impl MemoryEventCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, event: EventSummary) {
        self.events.write().insert(event.event_id, event);
    }

    pub fn remove(&self, event_id: Uuid) -> bool {
        self.events.write().remove(&event_id).is_some()
    }
}

#[async_trait]
impl EventCatalog for MemoryEventCatalog {
    async fn get_event(&self, event_id: Uuid) -> Result<Option<EventSummary>, BoxError> {
        Ok(self.events.read().get(&event_id).cloned())
    }
}

/// In-process stand-in for the user directory service. Unknown users are
/// rejected, matching the validation contract.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashSet<Uuid>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, user_id: Uuid) {
        self.users.write().insert(user_id);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, BoxError> {
        Ok(self.users.read().contains(&user_id))
    }
}
