//! Per-pipeline vector storage contracts

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::pipeline::{Fragment, PipelineId, ScoredFragment};
use crate::domain::DomainError;

/// Opaque reference to one pipeline's persisted vector index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageHandle {
    pipeline_id: PipelineId,
    location: PathBuf,
}

impl StorageHandle {
    pub fn new(pipeline_id: PipelineId, location: impl Into<PathBuf>) -> Self {
        Self {
            pipeline_id,
            location: location.into(),
        }
    }

    pub fn pipeline_id(&self) -> PipelineId {
        self.pipeline_id
    }

    pub fn location(&self) -> &Path {
        &self.location
    }
}

/// An opened, searchable view of a pipeline's fragments.
#[async_trait]
pub trait VectorIndex: Send + Sync + Debug {
    fn pipeline_id(&self) -> PipelineId;

    /// Number of fragments the index was opened with
    fn fragment_count(&self) -> usize;

    /// Returns at most `top_k` fragments ordered by descending similarity.
    async fn search(&self, query: &str, top_k: usize)
    -> Result<Vec<ScoredFragment>, DomainError>;
}

/// Durable per-pipeline vector storage, one isolated namespace per id.
#[async_trait]
pub trait VectorStorage: Send + Sync + Debug {
    /// Builds a fresh namespace from the given fragments. The namespace only
    /// becomes visible once fully written.
    async fn create(
        &self,
        id: PipelineId,
        fragments: Vec<Fragment>,
    ) -> Result<StorageHandle, DomainError>;

    /// Locates an existing namespace. `NotFound` when nothing is on disk.
    async fn load(&self, id: PipelineId) -> Result<StorageHandle, DomainError>;

    /// Reads a namespace into a searchable index.
    async fn open_index(&self, handle: &StorageHandle)
    -> Result<Arc<dyn VectorIndex>, DomainError>;

    /// Durably appends fragments. Returns how many were added.
    async fn append(
        &self,
        handle: &StorageHandle,
        fragments: Vec<Fragment>,
    ) -> Result<usize, DomainError>;

    /// Removes a namespace. Returns false when there was nothing to remove.
    async fn destroy(&self, id: PipelineId) -> Result<bool, DomainError>;

    /// Every namespace currently present, registered or not.
    async fn list_namespaces(&self) -> Result<Vec<PipelineId>, DomainError>;
}
