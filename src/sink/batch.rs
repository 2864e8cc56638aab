//! Batching front for a [`LogStore`].
//!
//! `append` only does a `try_send`, so the engine loop never waits on the
//! store. A background task groups records and writes a batch when it is
//! full or when the first record in it has waited `commit_timeout_ms`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::settings::SinkConfig;
use crate::jobs::LogRecord;
use crate::sink::{LogStore, ResultSink};

pub struct BatchingSink {
    tx: mpsc::Sender<LogRecord>,
}

/// Background writer. Finishes after every [`BatchingSink`] is dropped and
/// the last partial batch is flushed.
pub struct SinkWorker {
    task: JoinHandle<()>,
}

impl SinkWorker {
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Result sink worker failed");
        }
    }
}

impl BatchingSink {
    pub fn spawn(store: Arc<dyn LogStore>, config: &SinkConfig) -> (Self, SinkWorker) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let batch_size = config.batch_size.max(1);
        let commit_timeout = Duration::from_millis(config.commit_timeout_ms);

        let task = tokio::spawn(write_batches(rx, store, batch_size, commit_timeout));
        (Self { tx }, SinkWorker { task })
    }
}

impl ResultSink for BatchingSink {
    fn append(&self, record: LogRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                tracing::warn!(job_name = %record.job_name, "Result sink queue full, dropping log record");
            }
            Err(TrySendError::Closed(record)) => {
                tracing::warn!(job_name = %record.job_name, "Result sink closed, dropping log record");
            }
        }
    }
}

async fn write_batches(
    mut rx: mpsc::Receiver<LogRecord>,
    store: Arc<dyn LogStore>,
    batch_size: usize,
    commit_timeout: Duration,
) {
    let mut batch: Vec<LogRecord> = Vec::with_capacity(batch_size);
    let mut deadline = Instant::now();

    loop {
        let next = if batch.is_empty() {
            rx.recv().await
        } else {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    flush(store.as_ref(), &mut batch).await;
                    continue;
                }
            }
        };

        let Some(record) = next else {
            flush(store.as_ref(), &mut batch).await;
            break;
        };

        if batch.is_empty() {
            deadline = Instant::now() + commit_timeout;
        }
        batch.push(record);
        if batch.len() >= batch_size {
            flush(store.as_ref(), &mut batch).await;
        }
    }

    tracing::debug!(store = store.name(), "Result sink worker finished");
}

async fn flush(store: &dyn LogStore, batch: &mut Vec<LogRecord>) {
    if batch.is_empty() {
        return;
    }
    let records = std::mem::take(batch);
    match store.insert_batch(&records).await {
        Ok(()) => tracing::debug!(store = store.name(), count = records.len(), "Job log batch written"),
        Err(e) => tracing::error!(
            store = store.name(),
            count = records.len(),
            error = %e,
            "Failed to write job log batch"
        ),
    }
}
