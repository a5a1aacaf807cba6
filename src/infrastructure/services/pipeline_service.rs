//! Pipeline lifecycle service - create, extend, query and delete pipelines

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use super::pipeline_locks::PipelineLocks;
use crate::domain::generation::AnswerGenerator;
use crate::domain::ingestion::{DocumentProcessor, DocumentUpload};
use crate::domain::pipeline::{
    DeletionSummary, Fragment, IngestionSummary, PipelineId, QueryAnswer, RetrievalChain,
};
use crate::domain::registry::RegistryIndex;
use crate::domain::vector_store::{StorageHandle, VectorStorage};
use crate::domain::DomainError;
use crate::infrastructure::cache::{PipelineCache, PipelineCacheConfig, PipelineCacheStats};
use crate::infrastructure::observability::{record_pipeline_operation, set_registered_pipelines};

/// Pipeline service configuration
#[derive(Debug, Clone)]
pub struct PipelineServiceConfig {
    /// Fragments retrieved per query
    pub top_k: usize,
    /// Limit for each storage, processing and model call
    pub operation_timeout: Duration,
    pub cache: PipelineCacheConfig,
}

impl Default for PipelineServiceConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            operation_timeout: Duration::from_secs(60),
            cache: PipelineCacheConfig::default(),
        }
    }
}

/// Trait for the pipeline service (for dynamic dispatch in AppState)
#[async_trait]
pub trait PipelineServiceTrait: Send + Sync + Debug {
    /// Index a first document under a new id
    async fn create_pipeline(
        &self,
        id: PipelineId,
        upload: DocumentUpload,
    ) -> Result<IngestionSummary, DomainError>;

    /// Append another document to an existing pipeline
    async fn add_data(
        &self,
        id: PipelineId,
        upload: DocumentUpload,
    ) -> Result<IngestionSummary, DomainError>;

    async fn query(&self, id: PipelineId, question: &str) -> Result<QueryAnswer, DomainError>;

    async fn delete_pipeline(&self, id: PipelineId) -> Result<DeletionSummary, DomainError>;

    /// Registered ids in ascending order
    async fn list_pipelines(&self) -> Result<Vec<PipelineId>, DomainError>;

    /// Destroy storage namespaces that have no registry entry
    async fn reclaim_orphans(&self) -> Result<Vec<PipelineId>, DomainError>;
}

/// Coordinates the registry, vector storage and the loaded-pipeline cache.
///
/// Mutations of one id are serialized by a per-id lock. Queries take no lock:
/// they go through the cache, which loads each pipeline at most once at a
/// time and is invalidated by every mutation before it returns.
pub struct PipelineService {
    registry: Arc<dyn RegistryIndex>,
    storage: Arc<dyn VectorStorage>,
    processor: Arc<dyn DocumentProcessor>,
    generator: Arc<dyn AnswerGenerator>,
    cache: PipelineCache,
    locks: PipelineLocks,
    config: PipelineServiceConfig,
}

impl Debug for PipelineService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineService")
            .field("storage", &self.storage)
            .field("generator", &self.generator.name())
            .field("config", &self.config)
            .finish()
    }
}

impl PipelineService {
    pub fn new(
        registry: Arc<dyn RegistryIndex>,
        storage: Arc<dyn VectorStorage>,
        processor: Arc<dyn DocumentProcessor>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self::with_config(
            registry,
            storage,
            processor,
            generator,
            PipelineServiceConfig::default(),
        )
    }

    pub fn with_config(
        registry: Arc<dyn RegistryIndex>,
        storage: Arc<dyn VectorStorage>,
        processor: Arc<dyn DocumentProcessor>,
        generator: Arc<dyn AnswerGenerator>,
        config: PipelineServiceConfig,
    ) -> Self {
        Self {
            registry,
            storage,
            processor,
            generator,
            cache: PipelineCache::new(config.cache.clone()),
            locks: PipelineLocks::new(),
            config,
        }
    }

    pub fn cache_stats(&self) -> PipelineCacheStats {
        self.cache.stats()
    }

    /// Whether a loaded chain for `id` is currently cached
    pub fn is_cached(&self, id: PipelineId) -> bool {
        self.cache.contains(id)
    }

    /// Storage namespaces with no registry entry, without touching them
    pub async fn find_orphans(&self) -> Result<Vec<PipelineId>, DomainError> {
        let registered: BTreeSet<PipelineId> = self.registry.list().await?.into_iter().collect();
        let namespaces = self
            .timed("storage.list", self.storage.list_namespaces())
            .await?;

        Ok(namespaces
            .into_iter()
            .filter(|id| !registered.contains(id))
            .collect())
    }

    /// Logs a warning for every orphaned namespace. Used at startup.
    pub async fn report_orphans(&self) -> Result<usize, DomainError> {
        let orphans = self.find_orphans().await?;

        for id in &orphans {
            warn!(pipeline_id = %id, "Storage namespace has no registry entry; run `reclaim` to remove it");
        }

        Ok(orphans.len())
    }

    async fn timed<T, F>(&self, operation: &'static str, future: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        let limit = self.config.operation_timeout;

        match tokio::time::timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = limit.as_millis() as u64, "Operation timed out");
                Err(DomainError::timeout(operation, limit))
            }
        }
    }

    async fn require_registered(&self, id: PipelineId) -> Result<(), DomainError> {
        if self.registry.exists(id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found(format!("Pipeline {} not found", id)))
        }
    }

    async fn process(&self, upload: DocumentUpload) -> Result<Vec<Fragment>, DomainError> {
        let fragments = self
            .timed("document.process", self.processor.process(upload))
            .await?;

        if fragments.is_empty() {
            return Err(DomainError::invalid_input("Document produced no text fragments"));
        }

        Ok(fragments)
    }

    /// Locates a registered pipeline's storage. A registered id with nothing
    /// on disk is corruption, not a missing pipeline.
    async fn load_handle(&self, id: PipelineId) -> Result<StorageHandle, DomainError> {
        match self.timed("storage.load", self.storage.load(id)).await {
            Err(e) if e.is_not_found() => {
                if self.registry.exists(id).await? {
                    error!(pipeline_id = %id, "Registered pipeline has no storage on disk");
                    Err(DomainError::storage(
                        "load",
                        format!("Pipeline {} is registered but its index is missing", id),
                    ))
                } else {
                    Err(DomainError::not_found(format!("Pipeline {} not found", id)))
                }
            }
            other => other,
        }
    }

    async fn load_chain(&self, id: PipelineId) -> Result<RetrievalChain, DomainError> {
        let started = Instant::now();
        let handle = self.load_handle(id).await?;
        let index = self
            .timed("storage.open_index", self.storage.open_index(&handle))
            .await?;

        info!(
            pipeline_id = %id,
            fragments = index.fragment_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pipeline loaded"
        );

        Ok(RetrievalChain::new(
            id,
            index,
            self.generator.clone(),
            self.config.top_k,
        ))
    }

    async fn refresh_registered_gauge(&self) {
        if let Ok(ids) = self.registry.list().await {
            set_registered_pipelines(ids.len());
        }
    }

    async fn create_inner(
        &self,
        id: PipelineId,
        upload: DocumentUpload,
    ) -> Result<IngestionSummary, DomainError> {
        if self.registry.exists(id).await? {
            return Err(already_exists(id));
        }

        let fragments = self.process(upload).await?;
        let fragment_count = fragments.len();

        let _guard = self.locks.acquire(id).await;

        // A concurrent create may have won while we were processing.
        if self.registry.exists(id).await? {
            return Err(already_exists(id));
        }

        self.cache.invalidate(id).await;

        if let Err(e) = self
            .timed("storage.create", self.storage.create(id, fragments))
            .await
        {
            self.rollback_create(id).await;
            return Err(e);
        }

        if let Err(e) = self.registry.register(id).await {
            self.rollback_create(id).await;
            return Err(e);
        }

        Ok(IngestionSummary {
            pipeline_id: id,
            fragments_indexed: fragment_count,
        })
    }

    async fn rollback_create(&self, id: PipelineId) {
        match self.timed("storage.destroy", self.storage.destroy(id)).await {
            Ok(_) => debug!(pipeline_id = %id, "Rolled back partial create"),
            Err(e) => warn!(
                pipeline_id = %id,
                error = %e,
                "Rollback left storage behind; it will be reported as an orphan"
            ),
        }
    }

    async fn add_inner(
        &self,
        id: PipelineId,
        upload: DocumentUpload,
    ) -> Result<IngestionSummary, DomainError> {
        self.require_registered(id).await?;

        let fragments = self.process(upload).await?;

        let _guard = self.locks.acquire(id).await;

        // Deleted while the document was being processed.
        self.require_registered(id).await?;

        let handle = self.load_handle(id).await?;
        let appended = self
            .timed("storage.append", self.storage.append(&handle, fragments))
            .await;

        // A timed-out append may still commit, so drop the cached chain either way.
        self.cache.invalidate(id).await;

        Ok(IngestionSummary {
            pipeline_id: id,
            fragments_indexed: appended?,
        })
    }

    async fn query_inner(
        &self,
        id: PipelineId,
        question: &str,
    ) -> Result<QueryAnswer, DomainError> {
        let question = question.trim();

        if question.is_empty() {
            return Err(DomainError::invalid_input("Question must not be empty"));
        }

        self.require_registered(id).await?;

        let chain = self.cache.get_or_load(id, self.load_chain(id)).await?;
        debug!(
            pipeline_id = %id,
            fragments = chain.fragment_count(),
            loaded_at = %chain.loaded_at(),
            "Answering from loaded pipeline"
        );

        self.timed("chain.ask", chain.ask(question)).await
    }

    async fn delete_inner(&self, id: PipelineId) -> Result<DeletionSummary, DomainError> {
        let _guard = self.locks.acquire(id).await;

        self.registry.unregister(id).await?;
        self.cache.forget(id).await;

        let storage_reclaimed = match self.timed("storage.destroy", self.storage.destroy(id)).await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    pipeline_id = %id,
                    error = %e,
                    "Pipeline unregistered but its storage could not be removed"
                );
                false
            }
        };

        Ok(DeletionSummary {
            pipeline_id: id,
            storage_reclaimed,
        })
    }
}

fn already_exists(id: PipelineId) -> DomainError {
    DomainError::already_exists(format!("Pipeline {} already exists", id))
}

fn observe<T>(operation: &'static str, started: Instant, result: &Result<T, DomainError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };

    record_pipeline_operation(operation, outcome, started.elapsed());
}

#[async_trait]
impl PipelineServiceTrait for PipelineService {
    #[instrument(skip(self, upload), fields(pipeline_id = %id, bytes = upload.len()))]
    async fn create_pipeline(
        &self,
        id: PipelineId,
        upload: DocumentUpload,
    ) -> Result<IngestionSummary, DomainError> {
        let started = Instant::now();
        let result = self.create_inner(id, upload).await;
        observe("create", started, &result);

        match &result {
            Ok(summary) => {
                info!(fragments = summary.fragments_indexed, "Pipeline created");
                self.refresh_registered_gauge().await;
            }
            Err(e) => debug!(error = %e, "Pipeline create rejected"),
        }

        result
    }

    #[instrument(skip(self, upload), fields(pipeline_id = %id, bytes = upload.len()))]
    async fn add_data(
        &self,
        id: PipelineId,
        upload: DocumentUpload,
    ) -> Result<IngestionSummary, DomainError> {
        let started = Instant::now();
        let result = self.add_inner(id, upload).await;
        observe("add", started, &result);

        match &result {
            Ok(summary) => info!(fragments = summary.fragments_indexed, "Pipeline extended"),
            Err(e) => debug!(error = %e, "Add data rejected"),
        }

        result
    }

    #[instrument(skip(self, question), fields(pipeline_id = %id))]
    async fn query(&self, id: PipelineId, question: &str) -> Result<QueryAnswer, DomainError> {
        let started = Instant::now();
        let result = self.query_inner(id, question).await;
        observe("query", started, &result);

        if let Err(e) = &result {
            debug!(error = %e, "Query failed");
        }

        result
    }

    #[instrument(skip(self), fields(pipeline_id = %id))]
    async fn delete_pipeline(&self, id: PipelineId) -> Result<DeletionSummary, DomainError> {
        let started = Instant::now();
        let result = self.delete_inner(id).await;
        observe("delete", started, &result);

        if let Ok(summary) = &result {
            info!(storage_reclaimed = summary.storage_reclaimed, "Pipeline deleted");
            self.refresh_registered_gauge().await;
        }

        result
    }

    async fn list_pipelines(&self) -> Result<Vec<PipelineId>, DomainError> {
        let ids = self.registry.list().await?;
        set_registered_pipelines(ids.len());
        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn reclaim_orphans(&self) -> Result<Vec<PipelineId>, DomainError> {
        let mut reclaimed = Vec::new();

        for id in self.find_orphans().await? {
            let _guard = self.locks.acquire(id).await;

            // Registered since the scan: the namespace is live now.
            if self.registry.exists(id).await? {
                continue;
            }

            if self
                .timed("storage.destroy", self.storage.destroy(id))
                .await?
            {
                info!(pipeline_id = %id, "Reclaimed orphaned storage");
                reclaimed.push(id);
            }
        }

        Ok(reclaimed)
    }
}
