//! Shared state for the control API handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::jobs::EngineHandle;

/// Cheap to clone: every field is a handle or shared string.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub node_id: Arc<str>,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: EngineHandle, node_id: &str) -> Self {
        Self {
            engine,
            node_id: Arc::from(node_id),
            version: crate::pkg_version(),
            started_at: Utc::now(),
        }
    }
}
