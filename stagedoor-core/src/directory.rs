use async_trait::async_trait;
use uuid::Uuid;

use crate::BoxError;

/// Read-only seam to the user directory service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, BoxError>;
}
