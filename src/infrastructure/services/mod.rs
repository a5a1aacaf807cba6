//! Infrastructure services

mod pipeline_locks;
mod pipeline_service;

pub use pipeline_locks::{PipelineGuard, PipelineLocks};
pub use pipeline_service::{PipelineService, PipelineServiceConfig, PipelineServiceTrait};
