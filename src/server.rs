//! HTTP surface of the relay server
//!
//! Session lifecycle routes plus the per-session WebSocket endpoint. The
//! relay holds only the in-memory session registry; canvas state and
//! credits live behind the durable store.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use inkstream_canvas::{Error as CanvasError, SessionManager};
use inkstream_realtime::{relay_router, RelayState};

/// Build the full relay router: session routes, health, and the
/// WebSocket endpoint.
pub fn build_router(sessions: Arc<SessionManager>) -> Router {
    let state = Arc::new(RelayState::new(sessions));
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/code/:code", get(find_session))
        .route("/sessions/:session_id", delete(delete_session))
        .with_state(state.clone())
        .merge(relay_router(state))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Deserialize)]
struct CreateSessionRequest {
    owner: String,
    join_code: String,
}

async fn create_session(
    State(state): State<Arc<RelayState>>,
    Json(request): Json<CreateSessionRequest>,
) -> Response {
    match state
        .sessions
        .create(request.owner, &request.join_code)
        .await
    {
        Ok(session) => {
            info!(session_id = %session.id, owner = %session.owner, "session created");
            (StatusCode::CREATED, Json(session)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn find_session(
    State(state): State<Arc<RelayState>>,
    Path(code): Path<String>,
) -> Response {
    match state.sessions.find_by_code(&code).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
struct DeleteSessionQuery {
    owner: String,
}

async fn delete_session(
    State(state): State<Arc<RelayState>>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<DeleteSessionQuery>,
) -> Response {
    match state.sessions.delete(session_id, &query.owner).await {
        Ok(session) => {
            info!(%session_id, owner = %query.owner, "session deleted");
            Json(json!({ "deleted": session.id })).into_response()
        }
        Err(e) => error_response(e),
    }
}

fn error_response(error: CanvasError) -> Response {
    let status = match &error {
        CanvasError::SessionNotFound(_) | CanvasError::UnknownJoinCode(_) => StatusCode::NOT_FOUND,
        CanvasError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
