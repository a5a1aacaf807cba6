//! In-process cache of loaded retrieval chains, built on moka

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::domain::pipeline::{PipelineId, RetrievalChain};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_cache_event;

/// Configuration for the pipeline cache
#[derive(Debug, Clone, Default)]
pub struct PipelineCacheConfig {
    /// Maximum number of loaded pipelines kept; unbounded when `None`
    pub max_capacity: Option<u64>,
    /// Pipelines not queried for this long are evicted
    pub time_to_idle: Option<Duration>,
}

impl PipelineCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    pub fn with_time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
}

/// Caches one loaded `RetrievalChain` per pipeline.
///
/// Entries are keyed by `(id, generation)`. `invalidate` moves the id to a
/// fresh generation, so a load that started before an invalidation can only
/// ever populate a key nobody asks for again, and it is removed as soon as the
/// loader notices. Concurrent misses for the same key share one load.
///
/// Generations are drawn from one counter and only tracked for ids that have
/// been invalidated and not yet forgotten, so deleted pipelines leave nothing
/// behind.
#[derive(Debug)]
pub struct PipelineCache {
    entries: MokaCache<(PipelineId, u64), Arc<RetrievalChain>>,
    generations: Mutex<HashMap<PipelineId, u64>>,
    next_generation: AtomicU64,
    forgotten: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
}

impl PipelineCache {
    pub fn new(config: PipelineCacheConfig) -> Self {
        let mut builder = MokaCache::builder();

        if let Some(capacity) = config.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        Self {
            entries: builder.build(),
            generations: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            forgotten: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    fn generation(&self, id: PipelineId) -> u64 {
        let generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        generations.get(&id).copied().unwrap_or(0)
    }

    /// Returns the cached chain for `id`, running `load` when absent.
    ///
    /// `load` is only polled by the caller that wins the race for a missing
    /// key; everyone else waits for its result, success or error. Failed
    /// loads are not cached.
    pub async fn get_or_load<F>(
        &self,
        id: PipelineId,
        load: F,
    ) -> Result<Arc<RetrievalChain>, DomainError>
    where
        F: Future<Output = Result<RetrievalChain, DomainError>>,
    {
        let generation = self.generation(id);
        let forgotten = self.forgotten.load(Ordering::Acquire);
        let key = (id, generation);

        if let Some(chain) = self.entries.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            record_cache_event("hit");
            return Ok(chain);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        record_cache_event("miss");

        let result = self
            .entries
            .try_get_with(key, async {
                self.loads.fetch_add(1, Ordering::Relaxed);
                record_cache_event("load");
                load.await.map(Arc::new)
            })
            .await;

        // An untracked id reads as generation 0 both before and after a
        // forget, so any forget during the load counts as stale for it.
        let stale = self.generation(id) != generation
            || (generation == 0 && self.forgotten.load(Ordering::Acquire) != forgotten);

        if stale {
            debug!(pipeline_id = %id, generation, "Dropping chain loaded before invalidation");
            self.entries.invalidate(&key).await;
            record_cache_event("stale");
        }

        result.map_err(|e| (*e).clone())
    }

    /// Makes every later `get_or_load` for `id` load afresh.
    pub async fn invalidate(&self, id: PipelineId) {
        let next = self.next_generation.fetch_add(1, Ordering::AcqRel);
        let previous = {
            let mut generations = self
                .generations
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            generations.insert(id, next).unwrap_or(0)
        };

        self.entries.invalidate(&(id, previous)).await;
        debug!(pipeline_id = %id, generation = next, "Pipeline cache invalidated");
    }

    /// Drops everything held for a deleted pipeline, including its
    /// generation. In-flight loads for `id` are discarded when they finish.
    pub async fn forget(&self, id: PipelineId) {
        let previous = {
            let mut generations = self
                .generations
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.forgotten.fetch_add(1, Ordering::AcqRel);
            generations.remove(&id).unwrap_or(0)
        };

        self.entries.invalidate(&(id, previous)).await;
        debug!(pipeline_id = %id, "Pipeline forgotten by cache");
    }

    /// Number of ids with a tracked generation
    pub fn tracked_generations(&self) -> usize {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether a loaded chain for the current generation of `id` is cached
    pub fn contains(&self, id: PipelineId) -> bool {
        self.entries.contains_key(&(id, self.generation(id)))
    }

    pub fn stats(&self) -> PipelineCacheStats {
        PipelineCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
        }
    }

    /// Approximate number of cached chains
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

impl Default for PipelineCache {
    fn default() -> Self {
        Self::new(PipelineCacheConfig::default())
    }
}
