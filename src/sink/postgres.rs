//! PostgreSQL log store on the shared diesel-async pool.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::jobs::{JobError, JobResult, LogRecord};
use crate::schema::job_logs;
use crate::sink::LogStore;

#[derive(Debug, Insertable)]
#[diesel(table_name = job_logs)]
struct NewJobLog<'a> {
    job_name: &'a str,
    command: &'a str,
    output: &'a str,
    plan_time: i64,
    schedule_time: i64,
    start_time: i64,
    end_time: i64,
    error: &'a str,
}

impl<'a> From<&'a LogRecord> for NewJobLog<'a> {
    fn from(record: &'a LogRecord) -> Self {
        Self {
            job_name: &record.job_name,
            command: &record.command,
            output: &record.output,
            plan_time: record.plan_time,
            schedule_time: record.schedule_time,
            start_time: record.start_time,
            end_time: record.end_time,
            error: &record.error,
        }
    }
}

#[derive(Clone)]
pub struct PostgresLogStore {
    pool: AsyncDbPool,
}

impl PostgresLogStore {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for PostgresLogStore {
    async fn insert_batch(&self, records: &[LogRecord]) -> JobResult<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| JobError::Sink(e.to_string()))?;

        let rows: Vec<NewJobLog<'_>> = records.iter().map(NewJobLog::from).collect();
        diesel::insert_into(job_logs::table)
            .values(&rows)
            .execute(&mut conn)
            .await
            .map_err(|e| JobError::Sink(e.to_string()))?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_borrows_record_fields() {
        let record = LogRecord {
            job_name: "backup".to_string(),
            command: "tar czf".to_string(),
            output: "ok".to_string(),
            plan_time: 1,
            schedule_time: 2,
            start_time: 3,
            end_time: 4,
            error: String::new(),
        };
        let row = NewJobLog::from(&record);
        assert_eq!(row.job_name, "backup");
        assert_eq!(row.schedule_time, 2);
        assert_eq!(row.end_time, 4);
        assert_eq!(row.error, "");
    }
}
