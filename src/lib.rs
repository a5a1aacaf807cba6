//! RAG Matrix
//!
//! Pipeline lifecycle and retrieval registry for retrieval-augmented
//! question answering:
//! - Durable registry of pipeline ids with create-once semantics
//! - Per-pipeline vector storage with crash-safe appends
//! - Lazily loaded, single-flight cache of query-ready pipelines
//! - HTTP service and CLI on top

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use api::state::AppState;
use config::{EmbeddingBackend, EmbeddingConfig, GeneratorBackend, GeneratorConfig};
use domain::embedding::EmbeddingProvider;
use domain::generation::AnswerGenerator;
use domain::ingestion::ChunkingConfig;
use infrastructure::{
    cache::PipelineCacheConfig,
    embedding::{HashingEmbeddingProvider, OpenAiEmbeddingProvider, DEFAULT_HASHING_DIMENSIONS},
    generation::{ExtractiveAnswerGenerator, LlmAnswerGenerator},
    ingestion::ChunkingDocumentProcessor,
    llm::{HttpClient, OpenAiProvider},
    registry::FileRegistryIndex,
    services::{PipelineService, PipelineServiceConfig},
    vector_store::FileVectorStorage,
};

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let service = build_pipeline_service(config).await?;

    match service.report_orphans().await {
        Ok(0) => {}
        Ok(count) => warn!(count, "Orphaned pipeline storage found at startup"),
        Err(e) => warn!(error = %e, "Could not scan for orphaned pipeline storage"),
    }

    Ok(AppState::new(service))
}

/// Wire the registry, vector storage, document processor and answer
/// generator described by `config` into a pipeline service.
pub async fn build_pipeline_service(config: &AppConfig) -> anyhow::Result<Arc<PipelineService>> {
    let registry_path = config.storage.registry_file();
    let registry = FileRegistryIndex::open(&registry_path)
        .await
        .with_context(|| format!("opening registry at {}", registry_path.display()))?;

    let embedder = create_embedding_provider(&config.embedding, config)?;
    let storage = FileVectorStorage::open(config.storage.pipelines_dir(), embedder)
        .await
        .context("opening vector storage")?;

    let chunking = ChunkingConfig {
        chunk_size: config.ingestion.chunk_size,
        chunk_overlap: config.ingestion.chunk_overlap,
        min_chunk_size: config.ingestion.min_chunk_size,
    };
    let processor = ChunkingDocumentProcessor::with_defaults(chunking)
        .context("invalid ingestion configuration")?
        .with_max_document_bytes(config.server.max_upload_bytes);

    let generator = create_answer_generator(&config.generator, config)?;

    let service_config = PipelineServiceConfig {
        top_k: config.retrieval.top_k,
        operation_timeout: config.timeouts.operation(),
        cache: PipelineCacheConfig {
            max_capacity: config.cache.max_capacity,
            time_to_idle: config.cache.time_to_idle(),
        },
    };

    info!(
        root = %config.storage.root.display(),
        top_k = service_config.top_k,
        generator = generator.name(),
        "Pipeline service ready"
    );

    Ok(Arc::new(PipelineService::with_config(
        Arc::new(registry),
        Arc::new(storage),
        Arc::new(processor),
        generator,
        service_config,
    )))
}

fn read_api_key(env_var: &str) -> anyhow::Result<String> {
    std::env::var(env_var)
        .with_context(|| format!("{} environment variable is required", env_var))
}

fn create_embedding_provider(
    embedding: &EmbeddingConfig,
    config: &AppConfig,
) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match embedding.provider {
        EmbeddingBackend::Hashing => {
            let dimensions = embedding.dimensions.unwrap_or(DEFAULT_HASHING_DIMENSIONS);
            info!(dimensions, "Using hashing embeddings");
            Ok(Arc::new(HashingEmbeddingProvider::new(dimensions)?))
        }
        EmbeddingBackend::OpenAi => {
            let api_key = read_api_key(&embedding.api_key_env)?;
            let client = HttpClient::with_timeout(config.timeouts.operation())?;
            let mut provider = OpenAiEmbeddingProvider::new(client, api_key, &embedding.model);

            if let Some(base_url) = &embedding.base_url {
                provider = provider.with_base_url(base_url);
            }

            if let Some(dimensions) = embedding.dimensions {
                provider = provider.with_dimensions(dimensions);
            }

            info!(model = %embedding.model, "Using OpenAI embeddings");
            Ok(Arc::new(provider))
        }
    }
}

fn create_answer_generator(
    generator: &GeneratorConfig,
    config: &AppConfig,
) -> anyhow::Result<Arc<dyn AnswerGenerator>> {
    match generator.provider {
        GeneratorBackend::Extractive => Ok(Arc::new(ExtractiveAnswerGenerator::new())),
        GeneratorBackend::OpenAi => {
            let api_key = read_api_key(&generator.api_key_env)?;
            let client = HttpClient::with_timeout(config.timeouts.operation())?;
            let provider = match &generator.base_url {
                Some(base_url) => OpenAiProvider::with_base_url(client, api_key, base_url),
                None => OpenAiProvider::new(client, api_key),
            };

            info!(model = %generator.model, "Using OpenAI answer generation");
            Ok(Arc::new(
                LlmAnswerGenerator::new(Arc::new(provider), &generator.model)
                    .with_temperature(generator.temperature)
                    .with_max_tokens(generator.max_tokens),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::domain::ingestion::DocumentUpload;
    use crate::domain::pipeline::PipelineId;
    use crate::infrastructure::services::PipelineServiceTrait;

    fn config_for(root: &std::path::Path) -> AppConfig {
        AppConfig {
            storage: StorageConfig {
                root: root.to_path_buf(),
            },
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_default_wiring_uses_storage_layout() {
        let dir = tempfile::tempdir().unwrap();
        let service = build_pipeline_service(&config_for(dir.path())).await.unwrap();
        let id = PipelineId::new(1).unwrap();

        service
            .create_pipeline(id, DocumentUpload::new("a.md", b"# Title\n\nSome text.".to_vec()))
            .await
            .unwrap();

        assert!(dir.path().join("registry").join("pipelines.keys").exists());
        assert!(dir.path().join("pipelines").join("1").join("manifest.json").exists());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.generator.provider = GeneratorBackend::OpenAi;
        config.generator.api_key_env = "RAG_MATRIX_TEST_UNSET_KEY".to_string();

        let err = build_pipeline_service(&config).await.unwrap_err();

        assert!(err.to_string().contains("RAG_MATRIX_TEST_UNSET_KEY"));
    }

    #[tokio::test]
    async fn test_state_creation() {
        let dir = tempfile::tempdir().unwrap();
        let state = create_app_state_with_config(&config_for(dir.path()))
            .await
            .unwrap();

        assert!(state.pipeline_service.list_pipelines().await.unwrap().is_empty());
    }
}
