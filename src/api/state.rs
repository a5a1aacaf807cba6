//! Application state shared by the handlers

use std::sync::Arc;

use crate::infrastructure::services::PipelineServiceTrait;

#[derive(Clone)]
pub struct AppState {
    pub pipeline_service: Arc<dyn PipelineServiceTrait>,
}

impl AppState {
    pub fn new(pipeline_service: Arc<dyn PipelineServiceTrait>) -> Self {
        Self { pipeline_service }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline_service", &self.pipeline_service)
            .finish()
    }
}
