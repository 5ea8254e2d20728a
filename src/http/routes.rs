use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Create the HTTP router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Environment queries
        .route("/devices", get(handlers::list_devices))
        .route("/scenarios", get(handlers::list_scenarios))
        // Session lifecycle
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:session_id/start", post(handlers::start_session))
        .route("/sessions/:session_id/stop", post(handlers::stop_session))
        .route("/sessions/:session_id/clear", post(handlers::clear_session))
        // Live configuration
        .route(
            "/sessions/:session_id/language",
            post(handlers::switch_language),
        )
        .route(
            "/sessions/:session_id/scenario",
            post(handlers::set_scenario),
        )
        .route("/sessions/:session_id/input", post(handlers::set_input))
        // Results
        .route(
            "/sessions/:session_id/stream",
            get(handlers::stream_session),
        )
        .route(
            "/sessions/:session_id/transcript",
            get(handlers::get_transcript),
        )
        .route("/sessions/:session_id/status", get(handlers::get_status))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        // Browser frontends stream results cross-origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
