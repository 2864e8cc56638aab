//! Execution log sink.
//!
//! The engine hands every finished run (other than lock contention) to a
//! [`ResultSink`]. The configured backend decides where records end up:
//! - `log`: structured tracing events
//! - `postgres`: the `job_logs` table
//! - `none`: discarded
//!
//! # Configuration
//!
//! ```toml
//! [sink]
//! backend = "postgres"
//! batch_size = 100
//! commit_timeout_ms = 1000
//! queue_capacity = 1000
//! ```

mod batch;
mod memory;
mod postgres;
mod tracing_store;
mod traits;

use std::sync::Arc;

pub use batch::{BatchingSink, SinkWorker};
pub use memory::MemoryLogStore;
pub use postgres::PostgresLogStore;
pub use tracing_store::TracingLogStore;
pub use traits::{LogStore, ResultSink};

pub use crate::config::settings::{SinkBackend, SinkConfig};
use crate::config::settings::DatabaseConfig;
use crate::db::{establish_async_connection_pool, run_pending_migrations};
use crate::error::AppResult;
use crate::jobs::LogRecord;

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ResultSink for NoopSink {
    fn append(&self, _record: LogRecord) {}
}

/// The sink handed to the engine, plus the worker to wait on at shutdown.
pub struct SinkHandle {
    pub sink: Arc<dyn ResultSink>,
    pub worker: Option<SinkWorker>,
}

impl SinkHandle {
    /// Drop the sink and wait for its last batch to be written.
    ///
    /// Only completes once every other clone of `sink` has been dropped too.
    pub async fn close(self) {
        let SinkHandle { sink, worker } = self;
        drop(sink);
        if let Some(worker) = worker {
            worker.wait().await;
        }
    }
}

/// Build the sink selected by `config.backend`.
///
/// The postgres backend connects eagerly and, with `database.auto_migrate`,
/// applies pending migrations first.
pub async fn build_sink(config: &SinkConfig, database: &DatabaseConfig) -> AppResult<SinkHandle> {
    let store: Arc<dyn LogStore> = match config.backend {
        SinkBackend::None => {
            return Ok(SinkHandle {
                sink: Arc::new(NoopSink),
                worker: None,
            });
        }
        SinkBackend::Log => Arc::new(TracingLogStore),
        SinkBackend::Postgres => {
            if database.auto_migrate {
                let applied = run_pending_migrations(&database.url).await?;
                tracing::info!(count = applied.len(), "Database migrations applied");
            }
            let pool = establish_async_connection_pool(database).await?;
            Arc::new(PostgresLogStore::new(pool))
        }
    };

    tracing::info!(
        store = store.name(),
        batch_size = config.batch_size,
        commit_timeout_ms = config.commit_timeout_ms,
        "Result sink initialized"
    );

    let (sink, worker) = BatchingSink::spawn(store, config);
    Ok(SinkHandle {
        sink: Arc::new(sink),
        worker: Some(worker),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_none_backend_has_no_worker() {
        let config = SinkConfig {
            backend: SinkBackend::None,
            ..Default::default()
        };
        let handle = build_sink(&config, &DatabaseConfig::default()).await.unwrap();
        assert!(handle.worker.is_none());
        handle.close().await;
    }

    #[tokio::test]
    async fn test_log_backend_spawns_worker() {
        let config = SinkConfig {
            backend: SinkBackend::Log,
            ..Default::default()
        };
        let handle = build_sink(&config, &DatabaseConfig::default()).await.unwrap();
        assert!(handle.worker.is_some());
        handle.close().await;
    }
}
