//! Job event intake.
//!
//! Accepts the same tagged payload the registry watch feed produces and
//! forwards it to the engine's event queue:
//!
//! ```json
//! { "type": "save", "job": { "name": "backup", "command": "tar ...", "cronExpr": "0 3 * * *" } }
//! ```

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::jobs::{JobEvent, parse_schedule};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EventAccepted {
    pub accepted: bool,
    pub kind: &'static str,
    pub job: String,
}

/// # Routes
/// - `POST /events` - Enqueue a save, delete or kill event
pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", post(submit_event))
}

/// Queue an event for the engine.
///
/// # Responses
/// - `202 Accepted` - Event queued
/// - `400 Bad Request` - Empty job name or unparseable cron expression on save
/// - `503 Service Unavailable` - Engine has stopped
pub async fn submit_event(
    State(state): State<AppState>,
    Json(event): Json<JobEvent>,
) -> AppResult<(StatusCode, Json<EventAccepted>)> {
    let job = event.job();
    if job.name.trim().is_empty() {
        return Err(AppError::Validation {
            field: "job.name".to_string(),
            reason: "Job name cannot be empty".to_string(),
        });
    }
    if let JobEvent::Save(job) = &event {
        parse_schedule(&job.cron_expr)?;
    }

    let accepted = EventAccepted {
        accepted: true,
        kind: event.kind(),
        job: job.name.clone(),
    };

    tracing::debug!(kind = accepted.kind, job = %accepted.job, "Event received over HTTP");
    state.engine.push_event(event).await?;

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}
