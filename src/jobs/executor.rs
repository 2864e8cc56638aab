use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use rand::Rng;

use crate::config::settings::SchedulerConfig;
use crate::jobs::error::JobError;
use crate::jobs::models::{ExecutionInfo, ExecutionResult};
use crate::jobs::process::run_shell;
use crate::jobs::scheduler::EngineHandle;
use crate::lock::{LockManager, ScopedLock};

/// Starts a dispatched run. Must return without waiting for the run.
pub trait JobDispatcher: Send + Sync {
    fn execute(&self, info: ExecutionInfo);
}

/// Runs jobs as shell commands under the job's distributed lock.
pub struct CommandExecutor {
    locks: Arc<dyn LockManager>,
    handle: EngineHandle,
    shell: Arc<str>,
    jitter_max: Duration,
}

impl CommandExecutor {
    pub fn new(locks: Arc<dyn LockManager>, handle: EngineHandle, config: &SchedulerConfig) -> Self {
        Self {
            locks,
            handle,
            shell: Arc::from(config.shell.as_str()),
            jitter_max: Duration::from_millis(config.jitter_max_ms),
        }
    }
}

impl JobDispatcher for CommandExecutor {
    fn execute(&self, info: ExecutionInfo) {
        let locks = Arc::clone(&self.locks);
        let handle = self.handle.clone();
        let shell = Arc::clone(&self.shell);
        let jitter_max = self.jitter_max;

        tokio::spawn(async move {
            let result = run_execution(locks.as_ref(), &shell, jitter_max, info).await;
            let job_name = result.job_name().to_string();
            if handle.push_result(result).await.is_err() {
                tracing::debug!(job_name = %job_name, "Engine stopped, dropping job result");
            }
        });
    }
}

/// One full attempt: jitter, lock, run, release.
///
/// The lock is released on every path. Losing the lock race starts no process.
pub async fn run_execution(
    locks: &dyn LockManager,
    shell: &str,
    jitter_max: Duration,
    info: ExecutionInfo,
) -> ExecutionResult {
    let mut result = ExecutionResult::new(info, Utc::now());
    let guard = ScopedLock::new(locks.acquire_handle(&result.info.job.name));

    tokio::select! {
        _ = tokio::time::sleep(jitter(jitter_max)) => {}
        _ = result.info.cancel.cancelled() => {}
    }

    match guard.try_lock().await {
        Err(e) => {
            result.error = Some(e);
            result.end_time = Utc::now();
        }
        Ok(()) => {
            result.start_time = Utc::now();
            let run = AssertUnwindSafe(run_shell(
                shell,
                &result.info.job.command,
                &result.info.cancel,
            ))
            .catch_unwind()
            .await;

            let (output, error) = run.unwrap_or_else(|_| {
                tracing::error!(job_name = %result.info.job.name, "Job runner panicked");
                (
                    Vec::new(),
                    Some(JobError::ExecutionFailed("job runner panicked".to_string())),
                )
            });
            result.output = output;
            result.error = error;
            result.end_time = Utc::now();
        }
    }

    guard.release().await;
    result
}

fn jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::models::{Job, SchedulePlan};
    use crate::jobs::plan::build_plan;
    use crate::jobs::scheduler::engine_channel;
    use crate::lock::MemoryLockManager;

    const SH: &str = "/bin/sh";

    fn info_for(command: &str) -> ExecutionInfo {
        let now = Utc::now();
        let plan: SchedulePlan = build_plan(&Job::new("job", command, "* * * * * *"), now).unwrap();
        ExecutionInfo::new(&plan, now, now)
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
        for _ in 0..100 {
            assert!(jitter(Duration::from_millis(50)) <= Duration::from_millis(50));
        }
    }

    #[tokio::test]
    async fn test_successful_run_reports_output() {
        let locks = MemoryLockManager::new();
        let info = info_for("echo hi");
        let real_time = info.real_time;

        let result = run_execution(&locks, SH, Duration::ZERO, info).await;
        assert!(result.error.is_none());
        assert_eq!(result.output, b"hi\n");
        assert!(result.start_time >= real_time);
        assert!(result.end_time >= result.start_time);
        assert!(!locks.is_locked("job"));
    }

    #[tokio::test]
    async fn test_held_lock_skips_process() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let locks = MemoryLockManager::new();
        let holder = locks.acquire_handle("job");
        holder.try_lock().await.unwrap();

        let info = info_for(&format!("touch {}", marker.display()));
        let result = run_execution(&locks, SH, Duration::ZERO, info).await;

        assert!(result.is_lock_contention());
        assert!(result.output.is_empty());
        assert!(!marker.exists());
        // The loser must not release the holder's lock.
        assert!(locks.is_locked("job"));
    }

    #[tokio::test]
    async fn test_failed_command_releases_lock() {
        let locks = MemoryLockManager::new();
        let result = run_execution(&locks, SH, Duration::ZERO, info_for("exit 1")).await;
        assert!(matches!(result.error, Some(JobError::ExecutionFailed(_))));
        assert!(!locks.is_locked("job"));
    }

    #[tokio::test]
    async fn test_dispatch_delivers_result_to_engine_queue() {
        let (handle, mut inbox) = engine_channel(&SchedulerConfig::default());
        let config = SchedulerConfig {
            shell: SH.to_string(),
            jitter_max_ms: 0,
            ..Default::default()
        };
        let executor = CommandExecutor::new(Arc::new(MemoryLockManager::new()), handle, &config);

        executor.execute(info_for("echo dispatched"));

        let result = tokio::time::timeout(Duration::from_secs(10), inbox.next_result())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.job_name(), "job");
        assert_eq!(result.output, b"dispatched\n");
    }

    #[tokio::test]
    async fn test_cancel_during_jitter_runs_nothing() {
        let locks = MemoryLockManager::new();
        let info = info_for("echo never");
        info.cancel.cancel();

        let result = run_execution(&locks, SH, Duration::from_secs(30), info).await;
        assert!(matches!(result.error, Some(JobError::Cancelled)));
        assert!(result.output.is_empty());
        assert!(!locks.is_locked("job"));
    }
}
