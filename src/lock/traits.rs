//! Distributed lock trait definitions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::jobs::JobResult;

/// A lock scoped to one job name.
///
/// At most one holder across every worker sharing the backend succeeds in
/// `try_lock` for a given job name while its lease is alive.
#[async_trait]
pub trait JobLock: Send + Sync {
    /// Non-blocking acquisition attempt.
    ///
    /// Fails with `JobError::LockAlreadyHeld` when another holder owns the lock.
    async fn try_lock(&self) -> JobResult<()>;

    /// Release the lock. Idempotent, and a no-op when never acquired.
    async fn unlock(&self);
}

/// Factory for per-job lock handles.
pub trait LockManager: Send + Sync {
    /// Create a handle for `job_name`. Never contends.
    fn acquire_handle(&self, job_name: &str) -> Arc<dyn JobLock>;
}
