use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Json},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::state::AppState;
use crate::audio::list_input_devices;
use crate::error::LuminoError;
use crate::scenario::Scenario;
use crate::session::{Language, SessionController};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SwitchLanguageRequest {
    pub spoken: Language,
}

#[derive(Debug, Deserialize)]
pub struct SetScenarioRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetInputRequest {
    pub device: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: &LuminoError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        LuminoError::AlreadyRunning | LuminoError::NotIdle(_) => StatusCode::CONFLICT,
        LuminoError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LuminoError::Device(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn not_found(session_id: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session {session_id} not found"),
        }),
    )
}

async fn lookup(state: &AppState, session_id: &str) -> Option<Arc<SessionController>> {
    state.sessions.read().await.get(session_id).cloned()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Create a session controller for one logical connection.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));

    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&session_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Session {session_id} already exists"),
                }),
            )
                .into_response();
        }
    }

    // Adapter construction resolves credentials here, before any capture
    // thread can be spawned.
    let controller = match SessionController::from_config(&state.config) {
        Ok(controller) => Arc::new(controller),
        Err(e) => {
            error!("failed to create session: {e}");
            return error_response(&e).into_response();
        }
    };

    state
        .sessions
        .write()
        .await
        .insert(session_id.clone(), controller);
    info!(session_id, "session created");

    (
        StatusCode::OK,
        Json(CreateSessionResponse {
            session_id,
            status: "idle".to_string(),
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/start
pub async fn start_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id).into_response();
    };

    match session.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                session_id,
                status: "listening".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("failed to start session {session_id}: {e}");
            error_response(&e).into_response()
        }
    }
}

/// POST /sessions/:session_id/stop
/// Idempotent: stopping an idle session is a no-op.
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id).into_response();
    };

    match session.stop().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                session_id,
                status: "idle".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("failed to stop session {session_id}: {e}");
            error_response(&e).into_response()
        }
    }
}

/// GET /sessions/:session_id/stream
/// Server-sent events: one `session` event per processed line, then a
/// terminal `stopped` payload when the loop unwinds.
pub async fn stream_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id).into_response();
    };

    let Some(rx) = session.take_stream() else {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "No active result stream; start the session first".to_string(),
            }),
        )
            .into_response();
    };

    let stream: std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>> =
        Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            let event = rx.recv().await?;
            let sse = Event::default().event("session").json_data(&event).ok()?;
            Some((Ok(sse), rx))
        }));

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// POST /sessions/:session_id/language
pub async fn switch_language(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SwitchLanguageRequest>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id).into_response();
    };

    session.switch_language(req.spoken);
    (StatusCode::OK, Json(session.stats())).into_response()
}

/// POST /sessions/:session_id/scenario
pub async fn set_scenario(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SetScenarioRequest>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id).into_response();
    };

    match session.set_scenario(&req.name) {
        Ok(()) => (StatusCode::OK, Json(session.stats())).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /sessions/:session_id/input
pub async fn set_input(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SetInputRequest>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id).into_response();
    };

    match session.set_input_device(req.device).await {
        Ok(()) => (StatusCode::OK, Json(session.stats())).into_response(),
        Err(e) => {
            error!("failed to switch input for session {session_id}: {e}");
            error_response(&e).into_response()
        }
    }
}

/// POST /sessions/:session_id/clear
/// Valid only while idle.
pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id).into_response();
    };

    match session.clear_conversation() {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                session_id,
                status: "cleared".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// GET /sessions/:session_id/transcript
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id).into_response();
    };

    (StatusCode::OK, Json(session.conversation())).into_response()
}

/// GET /sessions/:session_id/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id).into_response();
    };

    (StatusCode::OK, Json(session.stats())).into_response()
}

/// GET /scenarios
/// Ordered mapping of scenario name to description.
pub async fn list_scenarios(State(state): State<AppState>) -> impl IntoResponse {
    let mut catalog = crate::scenario::ScenarioCatalog::with_defaults();
    catalog.extend(state.config.scenarios.clone());
    let entries: Vec<Scenario> = catalog.entries().to_vec();
    (StatusCode::OK, Json(entries))
}

/// GET /devices
/// Ordered list of input device names, indexable by integer.
pub async fn list_devices() -> impl IntoResponse {
    (StatusCode::OK, Json(list_input_devices()))
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_variant_has_a_status() {
        let cases = [
            (LuminoError::AlreadyRunning, StatusCode::CONFLICT),
            (LuminoError::NotIdle("clear_conversation"), StatusCode::CONFLICT),
            (
                LuminoError::Configuration("missing key".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LuminoError::Device("no mic".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                LuminoError::Network("timeout".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                LuminoError::Internal("wav encode".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(&err).0, expected, "{err}");
        }
    }
}
