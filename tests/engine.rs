//! Full worker pipeline: engine loop, command executor, in-memory locks
//! and the result sinks, driven through the public handle.

use std::sync::Arc;
use std::time::Duration;

use fleetcron::config::{SchedulerConfig, SinkConfig};
use fleetcron::jobs::{
    CommandExecutor, EngineHandle, Job, JobEvent, LogRecord, ScheduleEngine, engine_channel,
};
use fleetcron::lock::{LockManager, MemoryLockManager};
use fleetcron::sink::{BatchingSink, MemoryLogStore, ResultSink};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EVERY_SECOND: &str = "* * * * * *";

fn scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        jitter_max_ms: 0,
        shell: "/bin/sh".to_string(),
        idle_interval_ms: 200,
        ..Default::default()
    }
}

struct Harness {
    handle: EngineHandle,
    locks: MemoryLockManager,
    shutdown: CancellationToken,
    engine: JoinHandle<()>,
}

impl Harness {
    fn start(sink: Arc<dyn ResultSink>) -> Self {
        let config = scheduler_config();
        let locks = MemoryLockManager::new();
        let (handle, inbox) = engine_channel(&config);
        let executor = CommandExecutor::new(Arc::new(locks.clone()), handle.clone(), &config);
        let engine = ScheduleEngine::new(Arc::new(executor), sink, &config);
        let shutdown = CancellationToken::new();
        let engine = tokio::spawn(engine.run(inbox, shutdown.clone()));

        Self {
            handle,
            locks,
            shutdown,
            engine,
        }
    }

    async fn save(&self, name: &str, command: &str) {
        self.handle
            .push_event(JobEvent::Save(Job::new(name, command, EVERY_SECOND)))
            .await
            .unwrap();
    }

    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.engine)
            .await
            .unwrap()
            .unwrap();
    }
}

async fn wait_for_records(store: &MemoryLogStore, count: usize) -> Vec<LogRecord> {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let records = store.records();
            if records.len() >= count {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_scheduled_command_output_is_logged() {
    let store = MemoryLogStore::default();
    let harness = Harness::start(Arc::new(store.clone()));
    harness.save("greeter", "echo hello").await;

    let records = wait_for_records(&store, 1).await;
    let record = &records[0];
    assert_eq!(record.job_name, "greeter");
    assert_eq!(record.command, "echo hello");
    assert_eq!(record.output, "hello\n");
    assert!(record.error.is_empty());
    assert!(record.schedule_time >= record.plan_time);
    assert!(record.end_time >= record.start_time);

    harness.stop().await;
}

#[tokio::test]
async fn test_kill_terminates_running_command() {
    let store = MemoryLogStore::default();
    let harness = Harness::start(Arc::new(store.clone()));
    harness.save("sleeper", "sleep 30").await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while !harness.locks.is_locked("sleeper") {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    harness
        .handle
        .push_event(JobEvent::Kill(Job::new("sleeper", "sleep 30", EVERY_SECOND)))
        .await
        .unwrap();

    let records = wait_for_records(&store, 1).await;
    assert_eq!(records[0].job_name, "sleeper");
    assert_eq!(records[0].error, "Job execution cancelled");
    assert!(records[0].end_time - records[0].start_time < 10_000);

    harness.stop().await;
}

#[tokio::test]
async fn test_lock_held_elsewhere_suppresses_runs() {
    let store = MemoryLogStore::default();
    let harness = Harness::start(Arc::new(store.clone()));

    let foreign = harness.locks.acquire_handle("contended");
    foreign.try_lock().await.unwrap();

    harness.save("contended", "echo should-not-run").await;
    harness.save("free", "echo ran").await;

    let records = wait_for_records(&store, 2).await;
    assert!(records.iter().all(|r| r.job_name == "free"));

    foreign.unlock().await;
    harness.stop().await;
}

#[tokio::test]
async fn test_deleted_job_stops_running() {
    let store = MemoryLogStore::default();
    let harness = Harness::start(Arc::new(store.clone()));
    harness.save("brief", "true").await;

    wait_for_records(&store, 1).await;
    harness
        .handle
        .push_event(JobEvent::Delete(Job::new("brief", "true", EVERY_SECOND)))
        .await
        .unwrap();

    // Allow a run that was already in flight to report.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let settled = store.records().len();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.records().len(), settled);

    harness.stop().await;
}

#[tokio::test]
async fn test_batching_sink_flushes_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");

    let store = MemoryLogStore::default();
    let config = SinkConfig {
        batch_size: 100,
        commit_timeout_ms: 60_000,
        ..Default::default()
    };
    let (sink, worker) = BatchingSink::spawn(Arc::new(store.clone()), &config);
    let harness = Harness::start(Arc::new(sink));
    harness
        .save("marker", &format!("touch {}", marker.display()))
        .await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while !marker.exists() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(store.records().is_empty());

    harness.stop().await;
    tokio::time::timeout(Duration::from_secs(5), worker.wait())
        .await
        .unwrap();

    let records = store.records();
    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r.job_name == "marker"));
}
