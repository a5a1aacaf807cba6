//! Registry index persisted as a plain keys file

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::pipeline::PipelineId;
use crate::domain::registry::RegistryIndex;
use crate::domain::DomainError;
use crate::infrastructure::fs::{io_error, temp_path, write_atomic};

/// File name of the keys file inside the registry directory
pub const REGISTRY_FILE: &str = "pipelines.keys";

/// Registry backed by a text file holding one pipeline id per line.
///
/// Every mutation rewrites the whole file atomically before the in-memory
/// mirror changes, so `exists` never reports an id that is not durable.
/// Blank lines and repeated ids are tolerated when reading.
#[derive(Debug)]
pub struct FileRegistryIndex {
    path: PathBuf,
    committed: RwLock<BTreeSet<PipelineId>>,
    writer: Mutex<()>,
}

impl FileRegistryIndex {
    /// Opens (or creates) the keys file at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("registry.open", parent, e))?;
        }

        let stale = temp_path(&path);
        if tokio::fs::try_exists(&stale).await.unwrap_or(false) {
            warn!(path = %stale.display(), "Discarding unfinished registry rewrite");
            tokio::fs::remove_file(&stale)
                .await
                .map_err(|e| io_error("registry.open", &stale, e))?;
        }

        let ids = match tokio::fs::read_to_string(&path).await {
            Ok(content) => Self::parse_keys(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(io_error("registry.open", &path, e)),
        };

        info!(path = %path.display(), pipelines = ids.len(), "Registry index loaded");

        Ok(Self {
            path,
            committed: RwLock::new(ids),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_keys(content: &str) -> Result<BTreeSet<PipelineId>, DomainError> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                line.parse::<PipelineId>().map_err(|e| {
                    DomainError::storage(
                        "registry.open",
                        format!("corrupt registry entry on line {}: {}", n + 1, e),
                    )
                })
            })
            .collect()
    }

    fn render(ids: &BTreeSet<PipelineId>) -> String {
        ids.iter().map(|id| format!("{}\n", id)).collect()
    }

    fn snapshot(&self) -> Result<BTreeSet<PipelineId>, DomainError> {
        self.committed
            .read()
            .map(|ids| ids.clone())
            .map_err(|_| DomainError::internal("registry lock poisoned"))
    }

    /// `write_atomic` only fails before the rename, so an error here leaves
    /// both the file and the mirror at the previous set.
    async fn commit(&self, operation: &str, next: BTreeSet<PipelineId>) -> Result<(), DomainError> {
        write_atomic(operation, &self.path, Self::render(&next).as_bytes()).await?;

        let mut committed = self
            .committed
            .write()
            .map_err(|_| DomainError::internal("registry lock poisoned"))?;
        *committed = next;

        Ok(())
    }
}

#[async_trait]
impl RegistryIndex for FileRegistryIndex {
    async fn exists(&self, id: PipelineId) -> Result<bool, DomainError> {
        self.committed
            .read()
            .map(|ids| ids.contains(&id))
            .map_err(|_| DomainError::internal("registry lock poisoned"))
    }

    async fn register(&self, id: PipelineId) -> Result<(), DomainError> {
        let _writer = self.writer.lock().await;

        let mut next = self.snapshot()?;
        if !next.insert(id) {
            return Err(DomainError::already_exists(format!(
                "pipeline {} is already registered",
                id
            )));
        }

        self.commit("registry.register", next).await?;
        debug!(pipeline_id = %id, "Pipeline registered");

        Ok(())
    }

    async fn unregister(&self, id: PipelineId) -> Result<(), DomainError> {
        let _writer = self.writer.lock().await;

        let mut next = self.snapshot()?;
        if !next.remove(&id) {
            return Err(DomainError::not_found(format!(
                "pipeline {} is not registered",
                id
            )));
        }

        self.commit("registry.unregister", next).await?;
        debug!(pipeline_id = %id, "Pipeline unregistered");

        Ok(())
    }

    async fn list(&self) -> Result<Vec<PipelineId>, DomainError> {
        Ok(self.snapshot()?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn id(value: u64) -> PipelineId {
        PipelineId::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_register_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry").join(REGISTRY_FILE);

        let registry = FileRegistryIndex::open(&path).await.unwrap();
        registry.register(id(3)).await.unwrap();
        registry.register(id(1)).await.unwrap();
        drop(registry);

        let reopened = FileRegistryIndex::open(&path).await.unwrap();
        assert!(reopened.exists(id(1)).await.unwrap());
        assert!(reopened.exists(id(3)).await.unwrap());
        assert_eq!(reopened.list().await.unwrap(), vec![id(1), id(3)]);
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "1\n3\n");
    }

    #[tokio::test]
    async fn test_duplicate_register_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileRegistryIndex::open(dir.path().join(REGISTRY_FILE))
            .await
            .unwrap();

        registry.register(id(7)).await.unwrap();
        let result = registry.register(id(7)).await;

        assert!(matches!(result, Err(DomainError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_unregister_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileRegistryIndex::open(dir.path().join(REGISTRY_FILE))
            .await
            .unwrap();

        let result = registry.unregister(id(9)).await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_unregister_removes_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REGISTRY_FILE);
        let registry = FileRegistryIndex::open(&path).await.unwrap();

        registry.register(id(1)).await.unwrap();
        registry.register(id(2)).await.unwrap();
        registry.unregister(id(1)).await.unwrap();

        assert!(!registry.exists(id(1)).await.unwrap());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "2\n");
    }

    #[tokio::test]
    async fn test_reads_blank_lines_and_repeats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REGISTRY_FILE);
        tokio::fs::write(&path, "\n1\n\n2\n\n2\n").await.unwrap();

        let registry = FileRegistryIndex::open(&path).await.unwrap();

        assert_eq!(registry.list().await.unwrap(), vec![id(1), id(2)]);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REGISTRY_FILE);
        tokio::fs::write(&path, "1\nnot-a-number\n").await.unwrap();

        let result = FileRegistryIndex::open(&path).await;

        assert!(matches!(result, Err(DomainError::StorageIo { .. })));
    }

    #[tokio::test]
    async fn test_leftover_temp_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REGISTRY_FILE);
        tokio::fs::write(temp_path(&path), "garbage").await.unwrap();

        let registry = FileRegistryIndex::open(&path).await.unwrap();

        assert!(registry.list().await.unwrap().is_empty());
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registers_are_all_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REGISTRY_FILE);
        let registry = Arc::new(FileRegistryIndex::open(&path).await.unwrap());

        let handles: Vec<_> = (1..=20)
            .map(|n| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.register(id(n)).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reopened = FileRegistryIndex::open(&path).await.unwrap();
        assert_eq!(reopened.list().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_failed_write_changes_neither_file_nor_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let registry_dir = dir.path().join("registry");
        let registry = FileRegistryIndex::open(registry_dir.join(REGISTRY_FILE))
            .await
            .unwrap();
        registry.register(id(1)).await.unwrap();

        tokio::fs::remove_dir_all(&registry_dir).await.unwrap();
        let err = registry.register(id(2)).await.unwrap_err();

        assert!(matches!(err, DomainError::StorageIo { .. }));
        assert!(!registry.exists(id(2)).await.unwrap());
        assert_eq!(registry.list().await.unwrap(), vec![id(1)]);
        assert!(!registry_dir.exists());
    }
}
