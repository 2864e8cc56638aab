//! Scoped lock release.

use std::sync::Arc;

use crate::jobs::JobResult;
use crate::lock::JobLock;

/// Owns a lock handle and guarantees `unlock` runs exactly once.
///
/// Call [`ScopedLock::release`] on normal exit paths. If the guard is dropped
/// without it (panic, aborted task), release is spawned on the current runtime.
pub struct ScopedLock {
    lock: Arc<dyn JobLock>,
    released: bool,
}

impl ScopedLock {
    pub fn new(lock: Arc<dyn JobLock>) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    pub async fn try_lock(&self) -> JobResult<()> {
        self.lock.try_lock().await
    }

    pub async fn release(mut self) {
        self.released = true;
        self.lock.unlock().await;
    }
}

impl Drop for ScopedLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let lock = Arc::clone(&self.lock);
            handle.spawn(async move { lock.unlock().await });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::{LockManager, MemoryLockManager};

    #[tokio::test]
    async fn test_release_unlocks() {
        let manager = MemoryLockManager::new();
        let guard = ScopedLock::new(manager.acquire_handle("job"));
        guard.try_lock().await.unwrap();
        assert!(manager.is_locked("job"));

        guard.release().await;
        assert!(!manager.is_locked("job"));
    }

    #[tokio::test]
    async fn test_drop_without_release_still_unlocks() {
        let manager = MemoryLockManager::new();
        {
            let guard = ScopedLock::new(manager.acquire_handle("job"));
            guard.try_lock().await.unwrap();
        }
        for _ in 0..50 {
            if !manager.is_locked("job") {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("lock was not released after drop");
    }

    #[tokio::test]
    async fn test_release_after_failed_acquire_keeps_holder() {
        let manager = MemoryLockManager::new();
        let holder = ScopedLock::new(manager.acquire_handle("job"));
        holder.try_lock().await.unwrap();

        let loser = ScopedLock::new(manager.acquire_handle("job"));
        assert!(loser.try_lock().await.is_err());
        loser.release().await;
        assert!(manager.is_locked("job"));

        holder.release().await;
        assert!(!manager.is_locked("job"));
    }
}
