//! Infrastructure layer - storage, providers and the pipeline service

pub mod cache;
pub mod embedding;
pub(crate) mod fs;
pub mod generation;
pub mod ingestion;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod registry;
pub mod services;
pub mod vector_store;
