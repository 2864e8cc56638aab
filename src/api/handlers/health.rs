//! Health check endpoint.

use axum::{Router, extract::State, response::Json, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub node_id: String,
    /// Timestamp of the check (RFC 3339)
    pub timestamp: String,
    pub uptime_secs: i64,
}

/// # Routes
/// - `GET /health` - Liveness check
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Reports the worker as up as long as it can answer.
///
/// # Example Response
/// ```json
/// {
///   "status": "ok",
///   "version": "0.1.0",
///   "node_id": "worker-1",
///   "timestamp": "2024-01-01T12:00:00+00:00",
///   "uptime_secs": 42
/// }
/// ```
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let now = chrono::Utc::now();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.to_string(),
        node_id: state.node_id.to_string(),
        timestamp: now.to_rfc3339(),
        uptime_secs: (now - state.started_at).num_seconds(),
    })
}
