use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::jobs::error::JobError;

// ============================================================================
// Job definitions and events
// ============================================================================

/// Job definition as stored in the shared registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub command: String,
    #[serde(rename = "cronExpr", alias = "cron_expr")]
    pub cron_expr: String,
}

impl Job {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        cron_expr: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            cron_expr: cron_expr.into(),
        }
    }
}

/// Change notification for a single job, as delivered by the watch feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "job", rename_all = "lowercase")]
pub enum JobEvent {
    Save(Job),
    Delete(Job),
    Kill(Job),
}

impl JobEvent {
    pub fn job(&self) -> &Job {
        match self {
            JobEvent::Save(job) | JobEvent::Delete(job) | JobEvent::Kill(job) => job,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            JobEvent::Save(_) => "save",
            JobEvent::Delete(_) => "delete",
            JobEvent::Kill(_) => "kill",
        }
    }
}

// ============================================================================
// Scheduling state
// ============================================================================

/// A job paired with its parsed schedule and next fire time.
///
/// `next_time` is `None` once the expression has no occurrence left.
#[derive(Debug, Clone)]
pub struct SchedulePlan {
    pub job: Job,
    pub schedule: cron::Schedule,
    pub next_time: Option<DateTime<Utc>>,
}

impl SchedulePlan {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_time.is_some_and(|next| next <= now)
    }

    /// Move `next_time` to the first occurrence strictly after `now`.
    pub fn advance(&mut self, now: DateTime<Utc>) {
        self.next_time = self.schedule.after(&now).next();
    }
}

/// Bookkeeping for one dispatched run.
#[derive(Debug, Clone)]
pub struct ExecutionInfo {
    pub job: Job,
    /// The due time that triggered this run.
    pub plan_time: DateTime<Utc>,
    /// When the engine actually dispatched it.
    pub real_time: DateTime<Utc>,
    pub cancel: CancellationToken,
}

impl ExecutionInfo {
    pub fn new(plan: &SchedulePlan, plan_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            job: plan.job.clone(),
            plan_time,
            real_time: now,
            cancel: CancellationToken::new(),
        }
    }
}

/// Outcome of one run, reported back to the engine.
#[derive(Debug)]
pub struct ExecutionResult {
    pub info: ExecutionInfo,
    pub output: Vec<u8>,
    pub error: Option<JobError>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn new(info: ExecutionInfo, start_time: DateTime<Utc>) -> Self {
        Self {
            info,
            output: Vec::new(),
            error: None,
            start_time,
            end_time: start_time,
        }
    }

    pub fn job_name(&self) -> &str {
        &self.info.job.name
    }

    pub fn is_lock_contention(&self) -> bool {
        self.error.as_ref().is_some_and(JobError::is_lock_contention)
    }
}

// ============================================================================
// Persisted log record
// ============================================================================

/// Persisted projection of an [`ExecutionResult`]; all times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub job_name: String,
    pub command: String,
    pub output: String,
    pub plan_time: i64,
    pub schedule_time: i64,
    pub start_time: i64,
    pub end_time: i64,
    pub error: String,
}

impl From<&ExecutionResult> for LogRecord {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            job_name: result.info.job.name.clone(),
            command: result.info.job.command.clone(),
            output: String::from_utf8_lossy(&result.output).into_owned(),
            plan_time: result.info.plan_time.timestamp_millis(),
            schedule_time: result.info.real_time.timestamp_millis(),
            start_time: result.start_time.timestamp_millis(),
            end_time: result.end_time.timestamp_millis(),
            error: result
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn info_at(ms: i64) -> ExecutionInfo {
        let at = Utc.timestamp_millis_opt(ms).unwrap();
        ExecutionInfo {
            job: Job::new("backup", "echo hi", "* * * * * *"),
            plan_time: at,
            real_time: at + chrono::Duration::milliseconds(3),
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn test_job_event_json_shape() {
        let json = r#"{"type":"save","job":{"name":"a","command":"echo","cronExpr":"* * * * *"}}"#;
        let event: JobEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, JobEvent::Save(Job::new("a", "echo", "* * * * *")));
        assert_eq!(event.kind(), "save");

        let kill = serde_json::to_value(JobEvent::Kill(Job::new("a", "echo", "* * * * *"))).unwrap();
        assert_eq!(kill["type"], "kill");
        assert_eq!(kill["job"]["cronExpr"], "* * * * *");
    }

    #[test]
    fn test_job_accepts_snake_case_cron_expr() {
        let job: Job =
            serde_json::from_str(r#"{"name":"a","command":"true","cron_expr":"0 * * * * *"}"#)
                .unwrap();
        assert_eq!(job.cron_expr, "0 * * * * *");
    }

    #[test]
    fn test_log_record_projection() {
        let mut result = ExecutionResult::new(info_at(1_000), Utc.timestamp_millis_opt(1_010).unwrap());
        result.end_time = Utc.timestamp_millis_opt(1_500).unwrap();
        result.output = b"hello\n".to_vec();

        let record = LogRecord::from(&result);
        assert_eq!(record.job_name, "backup");
        assert_eq!(record.command, "echo hi");
        assert_eq!(record.output, "hello\n");
        assert_eq!(record.plan_time, 1_000);
        assert_eq!(record.schedule_time, 1_003);
        assert_eq!(record.start_time, 1_010);
        assert_eq!(record.end_time, 1_500);
        assert_eq!(record.error, "");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["jobName"], "backup");
        assert_eq!(value["scheduleTime"], 1_003);
    }

    #[test]
    fn test_log_record_carries_error_text() {
        let mut result = ExecutionResult::new(info_at(0), Utc.timestamp_millis_opt(0).unwrap());
        result.error = Some(JobError::Cancelled);
        assert_eq!(LogRecord::from(&result).error, "Job execution cancelled");
        assert!(!result.is_lock_contention());

        result.error = Some(JobError::LockAlreadyHeld("backup".into()));
        assert!(result.is_lock_contention());
    }

    #[test]
    fn test_plan_exhausted_is_never_due() {
        let plan = SchedulePlan {
            job: Job::new("a", "true", "0 0 0 1 1 * 2001"),
            schedule: cron::Schedule::from_str("0 0 0 1 1 * 2001").unwrap(),
            next_time: None,
        };
        assert!(!plan.is_due(Utc::now()));
    }
}
