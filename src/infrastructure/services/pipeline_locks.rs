//! Per-pipeline mutation locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::pipeline::PipelineId;

/// One async lock per pipeline id, created on first use and dropped once the
/// last holder or waiter releases it. Different ids never contend.
#[derive(Debug, Default)]
pub struct PipelineLocks {
    locks: Mutex<HashMap<PipelineId, Arc<AsyncMutex<()>>>>,
}

/// Exclusive access to one pipeline id until dropped
#[derive(Debug)]
pub struct PipelineGuard<'a> {
    id: PipelineId,
    guard: Option<OwnedMutexGuard<()>>,
    owner: &'a PipelineLocks,
}

impl PipelineLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: PipelineId) -> PipelineGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(id).or_default().clone()
        };

        PipelineGuard {
            id,
            guard: Some(lock.lock_owned().await),
            owner: self,
        }
    }

    /// Number of ids with a live lock entry
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, id: PipelineId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        // Only the map's own reference left: nobody holds or awaits it.
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
    }
}

impl PipelineGuard<'_> {
    pub fn pipeline_id(&self) -> PipelineId {
        self.id
    }
}

impl Drop for PipelineGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.owner.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn id(value: u64) -> PipelineId {
        PipelineId::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = PipelineLocks::new();

        {
            let guard = locks.acquire(id(1)).await;
            assert_eq!(guard.pipeline_id(), id(1));
            assert_eq!(locks.len(), 1);
        }

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let locks = PipelineLocks::new();

        let _first = locks.acquire(id(1)).await;
        let second = tokio::time::timeout(Duration::from_millis(200), locks.acquire(id(2))).await;

        assert!(second.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_id_is_exclusive() {
        let locks = Arc::new(PipelineLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();

            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(id(7)).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }
}
