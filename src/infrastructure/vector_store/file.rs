//! Directory-per-pipeline vector storage on the local filesystem

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::format::{
    FORMAT_VERSION, MANIFEST_FILE, Manifest, STAGING_DIR, SegmentEntry, StoredRecord,
    segment_file_name,
};
use super::index::InMemoryVectorIndex;
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::pipeline::{Fragment, PipelineId};
use crate::domain::vector_store::{StorageHandle, VectorIndex, VectorStorage};
use crate::domain::DomainError;
use crate::infrastructure::fs::{io_error, sync_dir, write_atomic};

/// Texts sent to the embedding provider per call
const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

/// Stores each pipeline under `<root>/<id>/` as a manifest plus immutable
/// JSON segments.
///
/// A new namespace is built under `.staging` and renamed into place, so a
/// crash never leaves a half-written namespace at its final path. Appends
/// write a new segment and then atomically replace the manifest; the manifest
/// rewrite is the commit point.
#[derive(Debug)]
pub struct FileVectorStorage {
    root: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    embed_batch_size: usize,
}

impl FileVectorStorage {
    /// Opens the storage root, creating it if needed and clearing leftovers
    /// from interrupted creates and deletes.
    pub async fn open(
        root: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, DomainError> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);

        if tokio::fs::try_exists(&staging).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&staging)
                .await
                .map_err(|e| io_error("storage.open", &staging, e))?;
        }

        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(|e| io_error("storage.open", &staging, e))?;

        info!(
            root = %root.display(),
            embedding_provider = embedder.provider_name(),
            dimensions = embedder.dimensions(),
            "Vector storage opened"
        );

        Ok(Self {
            root,
            embedder,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
        })
    }

    pub fn with_embed_batch_size(mut self, batch_size: usize) -> Self {
        self.embed_batch_size = batch_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace(&self, id: PipelineId) -> PathBuf {
        self.root.join(id.to_string())
    }

    fn staging_path(&self, id: PipelineId, purpose: &str) -> PathBuf {
        self.root
            .join(STAGING_DIR)
            .join(format!("{}-{}-{}", id, purpose, Uuid::new_v4()))
    }

    async fn embed_fragments(
        &self,
        fragments: Vec<Fragment>,
    ) -> Result<Vec<StoredRecord>, DomainError> {
        let mut records = Vec::with_capacity(fragments.len());

        for batch in fragments.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|f| f.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;

            if vectors.len() != batch.len() {
                return Err(DomainError::upstream(
                    self.embedder.provider_name(),
                    format!("expected {} embeddings, got {}", batch.len(), vectors.len()),
                ));
            }

            records.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(vectors)
                    .map(|(fragment, embedding)| StoredRecord {
                        fragment,
                        embedding,
                    }),
            );
        }

        Ok(records)
    }

    async fn write_segment(
        operation: &str,
        dir: &Path,
        file: &str,
        records: &[StoredRecord],
    ) -> Result<(), DomainError> {
        let bytes = serde_json::to_vec(records)
            .map_err(|e| DomainError::internal(format!("failed to encode segment: {}", e)))?;

        write_atomic(operation, &dir.join(file), &bytes).await
    }

    async fn write_manifest(
        operation: &str,
        dir: &Path,
        manifest: &Manifest,
    ) -> Result<(), DomainError> {
        let bytes = serde_json::to_vec_pretty(manifest)
            .map_err(|e| DomainError::internal(format!("failed to encode manifest: {}", e)))?;

        write_atomic(operation, &dir.join(MANIFEST_FILE), &bytes).await
    }

    async fn read_manifest(operation: &str, dir: &Path) -> Result<Manifest, DomainError> {
        let path = dir.join(MANIFEST_FILE);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| io_error(operation, &path, e))?;

        let manifest: Manifest = serde_json::from_slice(&bytes).map_err(|e| {
            DomainError::storage(operation, format!("corrupt manifest {}: {}", path.display(), e))
        })?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(DomainError::storage(
                operation,
                format!(
                    "unsupported manifest version {} in {}",
                    manifest.format_version,
                    path.display()
                ),
            ));
        }

        Ok(manifest)
    }

    async fn read_segment(
        operation: &str,
        dir: &Path,
        entry: &SegmentEntry,
    ) -> Result<Vec<StoredRecord>, DomainError> {
        let path = dir.join(&entry.file);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| io_error(operation, &path, e))?;

        let records: Vec<StoredRecord> = serde_json::from_slice(&bytes).map_err(|e| {
            DomainError::storage(operation, format!("corrupt segment {}: {}", path.display(), e))
        })?;

        if records.len() != entry.fragments {
            return Err(DomainError::storage(
                operation,
                format!(
                    "segment {} holds {} records, manifest expects {}",
                    path.display(),
                    records.len(),
                    entry.fragments
                ),
            ));
        }

        Ok(records)
    }

    async fn build_namespace(
        &self,
        id: PipelineId,
        staging: &Path,
        records: &[StoredRecord],
    ) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(staging)
            .await
            .map_err(|e| io_error("storage.create", staging, e))?;

        let now = Utc::now();
        let segment = segment_file_name(0);
        Self::write_segment("storage.create", staging, &segment, records).await?;

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            pipeline_id: id.value(),
            embedding_provider: self.embedder.provider_name().to_string(),
            dimensions: self.embedder.dimensions(),
            segments: vec![SegmentEntry {
                file: segment,
                fragments: records.len(),
                committed_at: now,
            }],
            created_at: now,
            updated_at: now,
        };
        Self::write_manifest("storage.create", staging, &manifest).await?;

        let target = self.namespace(id);
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            warn!(pipeline_id = %id, "Replacing unregistered namespace left on disk");
            self.discard(id, &target).await?;
        }

        tokio::fs::rename(staging, &target)
            .await
            .map_err(|e| io_error("storage.create", &target, e))?;
        sync_dir("storage.create", &self.root).await
    }

    /// Moves a namespace out of its final path first so it disappears in one
    /// step, then removes the files.
    async fn discard(&self, id: PipelineId, dir: &Path) -> Result<(), DomainError> {
        let trash = self.staging_path(id, "deleted");

        tokio::fs::rename(dir, &trash)
            .await
            .map_err(|e| io_error("storage.destroy", dir, e))?;
        sync_dir("storage.destroy", &self.root).await?;

        if let Err(e) = tokio::fs::remove_dir_all(&trash).await {
            warn!(
                pipeline_id = %id,
                path = %trash.display(),
                error = %e,
                "Deleted namespace left in staging; it is cleared on next start"
            );
        }

        Ok(())
    }
}

#[async_trait]
impl VectorStorage for FileVectorStorage {
    async fn create(
        &self,
        id: PipelineId,
        fragments: Vec<Fragment>,
    ) -> Result<StorageHandle, DomainError> {
        let records = self.embed_fragments(fragments).await?;
        let staging = self.staging_path(id, "create");

        if let Err(e) = self.build_namespace(id, &staging, &records).await {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        debug!(pipeline_id = %id, fragments = records.len(), "Namespace created");

        Ok(StorageHandle::new(id, self.namespace(id)))
    }

    async fn load(&self, id: PipelineId) -> Result<StorageHandle, DomainError> {
        let dir = self.namespace(id);

        let present = tokio::fs::try_exists(dir.join(MANIFEST_FILE))
            .await
            .map_err(|e| io_error("storage.load", &dir, e))?;

        if !present {
            return Err(DomainError::not_found(format!(
                "no stored index for pipeline {}",
                id
            )));
        }

        Ok(StorageHandle::new(id, dir))
    }

    async fn open_index(
        &self,
        handle: &StorageHandle,
    ) -> Result<Arc<dyn VectorIndex>, DomainError> {
        let dir = handle.location();
        let manifest = Self::read_manifest("storage.open_index", dir).await?;

        if manifest.dimensions != self.embedder.dimensions() {
            return Err(DomainError::storage(
                "storage.open_index",
                format!(
                    "pipeline {} was indexed with {} dimensions ({}), current provider {} uses {}",
                    handle.pipeline_id(),
                    manifest.dimensions,
                    manifest.embedding_provider,
                    self.embedder.provider_name(),
                    self.embedder.dimensions()
                ),
            ));
        }

        let mut records = Vec::with_capacity(manifest.fragment_count());
        for entry in &manifest.segments {
            records.extend(Self::read_segment("storage.open_index", dir, entry).await?);
        }

        Ok(Arc::new(InMemoryVectorIndex::new(
            handle.pipeline_id(),
            records,
            self.embedder.clone(),
        )))
    }

    async fn append(
        &self,
        handle: &StorageHandle,
        fragments: Vec<Fragment>,
    ) -> Result<usize, DomainError> {
        let dir = handle.location();
        let mut manifest = Self::read_manifest("storage.append", dir).await?;

        if manifest.dimensions != self.embedder.dimensions() {
            return Err(DomainError::storage(
                "storage.append",
                format!(
                    "pipeline {} was indexed with {} dimensions, current provider uses {}",
                    handle.pipeline_id(),
                    manifest.dimensions,
                    self.embedder.dimensions()
                ),
            ));
        }

        let records = self.embed_fragments(fragments).await?;
        let appended = records.len();

        let segment = segment_file_name(manifest.segments.len());
        Self::write_segment("storage.append", dir, &segment, &records).await?;

        let now = Utc::now();
        manifest.segments.push(SegmentEntry {
            file: segment,
            fragments: appended,
            committed_at: now,
        });
        manifest.updated_at = now;
        Self::write_manifest("storage.append", dir, &manifest).await?;

        debug!(
            pipeline_id = %handle.pipeline_id(),
            appended,
            total = manifest.fragment_count(),
            "Fragments appended"
        );

        Ok(appended)
    }

    async fn destroy(&self, id: PipelineId) -> Result<bool, DomainError> {
        let dir = self.namespace(id);

        let present = tokio::fs::try_exists(&dir)
            .await
            .map_err(|e| io_error("storage.destroy", &dir, e))?;

        if !present {
            return Ok(false);
        }

        self.discard(id, &dir).await?;
        debug!(pipeline_id = %id, "Namespace destroyed");

        Ok(true)
    }

    async fn list_namespaces(&self) -> Result<Vec<PipelineId>, DomainError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| io_error("storage.list", &self.root, e))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("storage.list", &self.root, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            if let Ok(id) = name.parse::<PipelineId>() {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }
}
