//! Worker lifecycle: wires locks, sink, engine and the control API
//! together and runs them until a shutdown signal arrives.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::api::create_router;
use crate::config::{Environment, Settings};
use crate::error::{AppError, AppResult};
use crate::jobs::{CommandExecutor, JobEvent, ScheduleEngine, engine_channel};
use crate::lock::build_lock_manager;
use crate::sink::build_sink;
use crate::state::AppState;

pub struct Worker {
    settings: Settings,
}

impl Worker {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Run until Ctrl+C or SIGTERM.
    pub async fn run(self) -> AppResult<()> {
        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            signal_token.cancel();
        });
        self.run_until(shutdown).await
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// On the way out the engine cancels every in-flight run, then the sink
    /// writes whatever it still buffers.
    pub async fn run_until(self, shutdown: CancellationToken) -> AppResult<()> {
        let Settings {
            application,
            worker,
            scheduler,
            lock,
            sink,
            database,
            server,
            logger,
            jobs,
        } = self.settings;

        tracing::info!(
            app_name = %application.name,
            app_version = %application.version,
            environment = %Environment::from_env().as_str(),
            node_id = %worker.node_id,
            "Worker starting"
        );
        tracing::info!(
            idle_interval_ms = scheduler.idle_interval_ms,
            jitter_max_ms = scheduler.jitter_max_ms,
            shell = %scheduler.shell,
            "Scheduler configuration loaded"
        );
        tracing::info!(
            backend = ?lock.backend,
            lease_ms = lock.lease_ms,
            "Lock configuration loaded"
        );
        tracing::info!(
            level = %logger.level,
            console_enabled = logger.console.enabled,
            file_enabled = logger.file.enabled,
            "Logger configuration loaded"
        );

        let locks = build_lock_manager(&lock).await?;
        let sink = build_sink(&sink, &database).await?;

        let (handle, inbox) = engine_channel(&scheduler);
        let executor = Arc::new(CommandExecutor::new(locks, handle.clone(), &scheduler));
        let engine = ScheduleEngine::new(executor, Arc::clone(&sink.sink), &scheduler);
        let engine_task = tokio::spawn(engine.run(inbox, shutdown.clone()));

        let seeded = jobs.len();
        for job in jobs {
            handle.push_event(JobEvent::Save(job)).await?;
        }
        if seeded > 0 {
            tracing::info!(count = seeded, "Seed jobs queued");
        }

        let served = if server.enabled {
            let state = AppState::new(handle.clone(), &worker.node_id);
            serve_api(&server.address(), state, shutdown.clone()).await
        } else {
            shutdown.cancelled().await;
            Ok(())
        };

        shutdown.cancel();
        drop(handle);

        if let Err(e) = engine_task.await {
            tracing::error!(error = %e, "Schedule engine task failed");
        }
        sink.close().await;

        tracing::info!("Worker shutdown complete");
        served
    }
}

async fn serve_api(address: &str, state: AppState, shutdown: CancellationToken) -> AppResult<()> {
    let listener = TcpListener::bind(address).await.map_err(|e| {
        tracing::error!(error = %e, address = %address, "Failed to bind to address");
        AppError::Internal {
            source: anyhow::anyhow!("Failed to bind to {}: {}", address, e),
        }
    })?;

    tracing::info!(address = %address, "Control API listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| AppError::Internal { source: e.into() })
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::SinkBackend;
    use std::time::Duration;

    #[tokio::test]
    async fn test_worker_stops_on_cancel() {
        let mut settings = Settings::default();
        settings.server.enabled = false;
        settings.sink.backend = SinkBackend::None;

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(Worker::new(settings).run_until(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bind_failure_still_shuts_down() {
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = blocker.local_addr().unwrap().port();

        let mut settings = Settings::default();
        settings.server.port = port;
        settings.sink.backend = SinkBackend::None;

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            Worker::new(settings).run_until(CancellationToken::new()),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(AppError::Internal { .. })));
    }
}
