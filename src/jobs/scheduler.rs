//! The schedule engine: a single control loop that owns every plan and
//! every in-flight execution of this worker.
//!
//! Nothing outside the loop touches the two tables. Producers talk to it
//! through [`EngineHandle`], whose bounded queues make senders wait when the
//! loop falls behind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::settings::SchedulerConfig;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::executor::JobDispatcher;
use crate::jobs::models::{ExecutionInfo, ExecutionResult, JobEvent, LogRecord, SchedulePlan};
use crate::jobs::plan::build_plan;
use crate::sink::ResultSink;

/// Sending side of the engine's event and result queues.
#[derive(Clone)]
pub struct EngineHandle {
    events: mpsc::Sender<JobEvent>,
    results: mpsc::Sender<ExecutionResult>,
}

impl EngineHandle {
    /// Enqueue a job change, waiting while the event queue is full.
    pub async fn push_event(&self, event: JobEvent) -> JobResult<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| JobError::EngineStopped)
    }

    /// Enqueue a finished run, waiting while the result queue is full.
    pub async fn push_result(&self, result: ExecutionResult) -> JobResult<()> {
        self.results
            .send(result)
            .await
            .map_err(|_| JobError::EngineStopped)
    }
}

/// Receiving side of the engine queues, consumed by [`ScheduleEngine::run`].
pub struct EngineInbox {
    events: mpsc::Receiver<JobEvent>,
    results: mpsc::Receiver<ExecutionResult>,
}

impl EngineInbox {
    /// Take the next queued event without an engine attached.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.events.recv().await
    }

    /// Take the next finished run without an engine attached.
    pub async fn next_result(&mut self) -> Option<ExecutionResult> {
        self.results.recv().await
    }
}

/// Create the bounded event and result queues.
pub fn engine_channel(config: &SchedulerConfig) -> (EngineHandle, EngineInbox) {
    let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity.max(1));
    let (result_tx, result_rx) = mpsc::channel(config.result_queue_capacity.max(1));

    (
        EngineHandle {
            events: event_tx,
            results: result_tx,
        },
        EngineInbox {
            events: event_rx,
            results: result_rx,
        },
    )
}

pub struct ScheduleEngine {
    plans: HashMap<String, SchedulePlan>,
    executing: HashMap<String, ExecutionInfo>,
    dispatcher: Arc<dyn JobDispatcher>,
    sink: Arc<dyn ResultSink>,
    idle_interval: Duration,
}

impl ScheduleEngine {
    pub fn new(
        dispatcher: Arc<dyn JobDispatcher>,
        sink: Arc<dyn ResultSink>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            plans: HashMap::new(),
            executing: HashMap::new(),
            dispatcher,
            sink,
            idle_interval: Duration::from_millis(config.idle_interval_ms),
        }
    }

    pub fn plan(&self, job_name: &str) -> Option<&SchedulePlan> {
        self.plans.get(job_name)
    }

    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    pub fn is_executing(&self, job_name: &str) -> bool {
        self.executing.contains_key(job_name)
    }

    pub fn executing_count(&self) -> usize {
        self.executing.len()
    }

    /// Apply one job change to the schedule table.
    ///
    /// A SAVE computes the first fire time right away. DELETE only stops
    /// future firings; an in-flight run finishes on its own.
    pub fn apply_event(&mut self, event: JobEvent, now: DateTime<Utc>) {
        match event {
            JobEvent::Save(job) => match build_plan(&job, now) {
                Ok(plan) => {
                    tracing::info!(
                        job_name = %job.name,
                        cron_expr = %job.cron_expr,
                        next_time = ?plan.next_time,
                        "Job scheduled"
                    );
                    self.plans.insert(job.name, plan);
                }
                Err(e) => {
                    tracing::warn!(job_name = %job.name, error = %e, "Discarding job with invalid schedule");
                }
            },
            JobEvent::Delete(job) => {
                if self.plans.remove(&job.name).is_some() {
                    tracing::info!(job_name = %job.name, "Job removed from schedule");
                }
            }
            JobEvent::Kill(job) => match self.executing.get(&job.name) {
                Some(info) => {
                    tracing::info!(job_name = %job.name, "Killing running job");
                    info.cancel.cancel();
                }
                None => tracing::debug!(job_name = %job.name, "Kill for job that is not running"),
            },
        }
    }

    /// Fire every due plan and return how long the loop may sleep.
    ///
    /// Due plans always advance past `now`, also when the dispatch was
    /// skipped, so a busy job never accumulates catch-up fires.
    pub fn reschedule(&mut self, now: DateTime<Utc>) -> Duration {
        if self.plans.is_empty() {
            return self.idle_interval;
        }

        let due: Vec<(String, DateTime<Utc>)> = self
            .plans
            .values()
            .filter(|plan| plan.is_due(now))
            .filter_map(|plan| plan.next_time.map(|next| (plan.job.name.clone(), next)))
            .collect();

        for (job_name, plan_time) in due {
            self.try_start(&job_name, plan_time, now);
            if let Some(plan) = self.plans.get_mut(&job_name) {
                plan.advance(now);
            }
        }

        let nearest = self.plans.values().filter_map(|plan| plan.next_time).min();
        match nearest {
            Some(next) => (next - now).to_std().unwrap_or(Duration::ZERO),
            // Every remaining expression is exhausted.
            None => self.idle_interval,
        }
    }

    fn try_start(&mut self, job_name: &str, plan_time: DateTime<Utc>, now: DateTime<Utc>) {
        if self.executing.contains_key(job_name) {
            tracing::debug!(job_name = %job_name, plan_time = %plan_time, "Job still running, skipping");
            return;
        }
        let Some(plan) = self.plans.get(job_name) else {
            return;
        };

        let info = ExecutionInfo::new(plan, plan_time, now);
        tracing::info!(
            job_name = %job_name,
            plan_time = %plan_time,
            real_time = %now,
            "Job dispatched"
        );
        self.executing.insert(job_name.to_string(), info.clone());
        self.dispatcher.execute(info);
    }

    /// Clear the in-flight entry for a finished run and log its outcome.
    ///
    /// Lock contention is the ordinary result for all but one worker and is
    /// not written to the sink.
    pub fn apply_result(&mut self, result: ExecutionResult) {
        self.executing.remove(result.job_name());

        if result.is_lock_contention() {
            tracing::debug!(job_name = %result.job_name(), "Job ran on another worker");
            return;
        }

        match &result.error {
            Some(e) => tracing::warn!(
                job_name = %result.job_name(),
                output_len = result.output.len(),
                error = %e,
                "Job finished with error"
            ),
            None => tracing::info!(
                job_name = %result.job_name(),
                output_len = result.output.len(),
                "Job finished"
            ),
        }
        self.sink.append(LogRecord::from(&result));
    }

    /// Drive the engine until `shutdown` fires, then cancel in-flight runs.
    pub async fn run(mut self, mut inbox: EngineInbox, shutdown: CancellationToken) {
        tracing::info!("Schedule engine started");

        let delay = self.reschedule(Utc::now());
        let timer = tokio::time::sleep(delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(event) = inbox.events.recv() => {
                    tracing::debug!(job_name = %event.job().name, kind = event.kind(), "Job event received");
                    self.apply_event(event, Utc::now());
                }
                Some(result) = inbox.results.recv() => self.apply_result(result),
                _ = &mut timer => {}
            }

            let delay = self.reschedule(Utc::now());
            timer.as_mut().reset(Instant::now() + delay);
        }

        self.cancel_all();
        tracing::info!("Schedule engine stopped");
    }

    fn cancel_all(&mut self) {
        if self.executing.is_empty() {
            return;
        }
        tracing::info!(count = self.executing.len(), "Cancelling in-flight jobs");
        for info in self.executing.values() {
            info.cancel.cancel();
        }
    }
}
