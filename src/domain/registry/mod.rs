//! Registry of live pipeline identifiers

use async_trait::async_trait;

use crate::domain::pipeline::PipelineId;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Durable set of registered pipeline ids.
///
/// A successful `register` or `unregister` is visible to every later
/// `exists` call in this process and survives a restart.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RegistryIndex: Send + Sync {
    async fn exists(&self, id: PipelineId) -> Result<bool, DomainError>;

    /// Fails with `AlreadyExists` when the id is present.
    async fn register(&self, id: PipelineId) -> Result<(), DomainError>;

    /// Fails with `NotFound` when the id is absent.
    async fn unregister(&self, id: PipelineId) -> Result<(), DomainError>;

    /// All registered ids in ascending order
    async fn list(&self) -> Result<Vec<PipelineId>, DomainError>;
}
