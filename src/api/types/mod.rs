//! HTTP request, response and error types

pub mod error;
pub mod json;
pub mod pipeline;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
pub use pipeline::{
    DeleteResponse, IngestionResponse, PipelineListResponse, QueryRequest, QueryResponse,
    SourceFragment,
};
