//! In-memory store, used by tests and dry runs.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::jobs::{JobError, JobResult, LogRecord};
use crate::sink::{LogStore, ResultSink};

#[derive(Clone, Default)]
pub struct MemoryLogStore {
    records: Arc<Mutex<Vec<LogRecord>>>,
    batches: Arc<Mutex<Vec<usize>>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record received so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Size of each batch written through [`LogStore::insert_batch`].
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }
}

impl ResultSink for MemoryLogStore {
    fn append(&self, record: LogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn insert_batch(&self, records: &[LogRecord]) -> JobResult<()> {
        let mut stored = self
            .records
            .lock()
            .map_err(|e| JobError::Sink(e.to_string()))?;
        stored.extend_from_slice(records);
        drop(stored);

        if let Ok(mut batches) = self.batches.lock() {
            batches.push(records.len());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
