//! Router configuration for the control API.

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::state::AppState;

/// # Routes
/// - `/health` - Liveness
/// - `/api/events` - Job event intake
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new().merge(handlers::events::event_routes());

    Router::new()
        .merge(handlers::health::health_routes())
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
