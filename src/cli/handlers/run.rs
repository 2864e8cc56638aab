//! Run command handler

use crate::config::settings::{Settings, SinkBackend};
use crate::error::AppResult;
use crate::worker::Worker;

pub struct RunCommandHandler {
    config: Settings,
}

impl RunCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Start the worker, or with `dry_run` only print what it would do.
    pub async fn execute(self, dry_run: bool) -> AppResult<()> {
        self.config.validate()?;

        if dry_run {
            for line in self.summary() {
                println!("✓ {}", line);
            }
            println!("Dry run completed successfully - configuration is ready");
            return Ok(());
        }

        Worker::new(self.config).run().await
    }

    fn summary(&self) -> Vec<String> {
        let c = &self.config;
        let mut lines = vec![
            "Configuration is valid".to_string(),
            format!("Node id: {}", c.worker.node_id),
            format!("Lock backend: {:?} (lease {} ms)", c.lock.backend, c.lock.lease_ms),
            format!("Result sink: {:?}", c.sink.backend),
        ];
        if c.sink.backend == SinkBackend::Postgres {
            lines.push(format!(
                "Database pool: {} connections, auto_migrate = {}",
                c.database.max_connections, c.database.auto_migrate
            ));
        }
        if c.server.enabled {
            lines.push(format!("Control API would bind to: {}", c.server.address()));
        } else {
            lines.push("Control API disabled".to_string());
        }
        lines.push(format!("Seed jobs: {}", c.jobs.len()));
        lines
    }
}
