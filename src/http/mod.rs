//! HTTP control surface for the hosting transport layer:
//! - POST /sessions - create a session controller
//! - POST /sessions/:id/start | /stop | /clear - lifecycle
//! - POST /sessions/:id/language | /scenario | /input - live configuration
//! - GET /sessions/:id/stream - SSE stream of (line, translation, context)
//! - GET /sessions/:id/transcript | /status, /scenarios, /devices, /health

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
