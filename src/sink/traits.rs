use async_trait::async_trait;

use crate::jobs::{JobResult, LogRecord};

/// Destination for execution log records.
///
/// Called from the engine loop, so implementations must not block.
pub trait ResultSink: Send + Sync {
    fn append(&self, record: LogRecord);
}

/// Durable storage that receives records in batches.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn insert_batch(&self, records: &[LogRecord]) -> JobResult<()>;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;
}
