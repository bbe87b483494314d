use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BoxError;

/// Read model the event catalog exposes to the booking core. The catalog
/// owns every other event field (title, venue, pricing, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: Uuid,
    pub total_seats: u32,
    pub event_date_time: DateTime<Utc>,
}

/// Read-only seam to the event catalog service.
#[async_trait]
pub trait EventCatalog: Send + Sync {
    async fn get_event(&self, event_id: Uuid) -> Result<Option<EventSummary>, BoxError>;
}
