//! Cache infrastructure

mod pipeline_cache;

pub use pipeline_cache::{PipelineCache, PipelineCacheConfig, PipelineCacheStats};
