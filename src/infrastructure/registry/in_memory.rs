//! Process-local registry index

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::pipeline::PipelineId;
use crate::domain::registry::RegistryIndex;
use crate::domain::DomainError;

/// Registry that lives only as long as the process. Useful for tests and
/// throwaway servers.
#[derive(Debug, Default)]
pub struct InMemoryRegistryIndex {
    ids: RwLock<BTreeSet<PipelineId>>,
}

impl InMemoryRegistryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryIndex for InMemoryRegistryIndex {
    async fn exists(&self, id: PipelineId) -> Result<bool, DomainError> {
        let ids = self
            .ids
            .read()
            .map_err(|_| DomainError::internal("registry lock poisoned"))?;

        Ok(ids.contains(&id))
    }

    async fn register(&self, id: PipelineId) -> Result<(), DomainError> {
        let mut ids = self
            .ids
            .write()
            .map_err(|_| DomainError::internal("registry lock poisoned"))?;

        if !ids.insert(id) {
            return Err(DomainError::already_exists(format!(
                "pipeline {} is already registered",
                id
            )));
        }

        Ok(())
    }

    async fn unregister(&self, id: PipelineId) -> Result<(), DomainError> {
        let mut ids = self
            .ids
            .write()
            .map_err(|_| DomainError::internal("registry lock poisoned"))?;

        if !ids.remove(&id) {
            return Err(DomainError::not_found(format!(
                "pipeline {} is not registered",
                id
            )));
        }

        Ok(())
    }

    async fn list(&self) -> Result<Vec<PipelineId>, DomainError> {
        let ids = self
            .ids
            .read()
            .map_err(|_| DomainError::internal("registry lock poisoned"))?;

        Ok(ids.iter().copied().collect())
    }
}
