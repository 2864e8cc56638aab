use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid cron expression '{expr}': {reason}")]
    InvalidCronExpression { expr: String, reason: String },

    #[error("Lock already held for job: {0}")]
    LockAlreadyHeld(String),

    #[error("Lock backend error: {0}")]
    Lock(String),

    #[error("Failed to spawn job process: {0}")]
    Spawn(String),

    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Job execution cancelled")]
    Cancelled,

    #[error("Result sink error: {0}")]
    Sink(String),

    #[error("Schedule engine has stopped")]
    EngineStopped,
}

impl JobError {
    /// Lock contention is the normal outcome for every worker but one.
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, JobError::LockAlreadyHeld(_))
    }
}

pub type JobResult<T> = Result<T, JobError>;
