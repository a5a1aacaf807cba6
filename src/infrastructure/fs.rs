//! Durable file helpers shared by the registry and vector storage

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::domain::DomainError;

pub(crate) fn io_error(operation: &str, path: &Path, err: std::io::Error) -> DomainError {
    DomainError::storage(operation, format!("{}: {}", path.display(), err))
}

/// Sibling path used while a file is being rewritten.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Replaces `path` with `contents` so that readers see either the old file or
/// the complete new one: write a sibling, fsync it, rename over, fsync the
/// directory.
///
/// Once the rename lands the new contents are what a restart will read, so a
/// failed directory fsync after that point is logged and not returned.
pub(crate) async fn write_atomic(
    operation: &str,
    path: &Path,
    contents: &[u8],
) -> Result<(), DomainError> {
    write_atomic_with(operation, path, contents, |dir| async move {
        sync_dir(operation, &dir).await
    })
    .await
}

async fn write_atomic_with<F, Fut>(
    operation: &str,
    path: &Path,
    contents: &[u8],
    sync_parent: F,
) -> Result<(), DomainError>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<(), DomainError>>,
{
    let tmp = temp_path(path);

    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| io_error(operation, &tmp, e))?;
    file.write_all(contents)
        .await
        .map_err(|e| io_error(operation, &tmp, e))?;
    file.sync_all()
        .await
        .map_err(|e| io_error(operation, &tmp, e))?;
    drop(file);

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_error(operation, path, e))?;

    if let Some(parent) = path.parent() {
        if let Err(e) = sync_parent(parent.to_path_buf()).await {
            warn!(operation, error = %e, "Directory sync failed after rename");
        }
    }

    Ok(())
}

/// Flushes directory entries so renames inside `dir` survive a crash.
pub(crate) async fn sync_dir(operation: &str, dir: &Path) -> Result<(), DomainError> {
    #[cfg(unix)]
    {
        let handle = tokio::fs::File::open(dir)
            .await
            .map_err(|e| io_error(operation, dir, e))?;
        handle
            .sync_all()
            .await
            .map_err(|e| io_error(operation, dir, e))?;
    }

    #[cfg(not(unix))]
    let _ = (operation, dir);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        write_atomic("test", &path, b"first").await.unwrap();
        write_atomic("test", &path, b"second").await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"second");
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_write_atomic_reports_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("data.json");

        let result = write_atomic("test", &path, b"x").await;

        assert!(matches!(result, Err(DomainError::StorageIo { .. })));
    }

    #[tokio::test]
    async fn test_failed_directory_sync_keeps_renamed_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        write_atomic("test", &path, b"first").await.unwrap();

        let result = write_atomic_with("test", &path, b"second", |dir| async move {
            Err(DomainError::storage("test", format!("{}: sync refused", dir.display())))
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"second");
        assert!(!temp_path(&path).exists());
    }
}
