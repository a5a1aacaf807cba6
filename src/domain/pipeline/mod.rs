//! Pipeline domain types

mod answer;
mod fragment;
mod id;
mod retrieval;

pub use answer::{DeletionSummary, IngestionSummary, QueryAnswer};
pub use fragment::{Fragment, ScoredFragment, SourceMetadata};
pub use id::PipelineId;
pub use retrieval::RetrievalChain;
