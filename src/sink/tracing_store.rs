use async_trait::async_trait;

use crate::jobs::{JobResult, LogRecord};
use crate::sink::LogStore;

/// Writes each record as a structured event on the `fleetcron::joblog` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogStore;

#[async_trait]
impl LogStore for TracingLogStore {
    async fn insert_batch(&self, records: &[LogRecord]) -> JobResult<()> {
        for record in records {
            tracing::info!(
                target: "fleetcron::joblog",
                job_name = %record.job_name,
                command = %record.command,
                plan_time = record.plan_time,
                schedule_time = record.schedule_time,
                start_time = record.start_time,
                end_time = record.end_time,
                error = %record.error,
                output = %record.output,
                "job log"
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
