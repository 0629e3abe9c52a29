use crate::domain::Username;
use async_trait::async_trait;

use super::RepositoryError;

/// Read-only view of the user subsystem.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, username: &Username) -> Result<bool, RepositoryError>;
}
