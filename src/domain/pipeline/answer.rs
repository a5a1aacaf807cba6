//! Query answers

use serde::{Deserialize, Serialize};

use super::ScoredFragment;

/// Generated answer plus the fragments that supported it, best match first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<ScoredFragment>,
}

/// Result of a successful create or add-data call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub pipeline_id: super::PipelineId,
    pub fragments_indexed: usize,
}

/// Result of a successful delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSummary {
    pub pipeline_id: super::PipelineId,
    /// False when the registry entry was removed but on-disk state was left
    /// behind for a later reclaim pass.
    pub storage_reclaimed: bool,
}
