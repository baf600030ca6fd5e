//! HTTP request handlers

use super::types::{ActionResponse, ErrorResponse, FilmsQuery, FilmsResponse};
use super::AppState;
use crate::conversation::Action;
use crate::runtime::SessionError;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Longest accepted session id
const MAX_SESSION_ID_LEN: usize = 128;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // User actions
        .route("/api/sessions/:id/actions", post(send_action))
        // Read-only collection view
        .route("/api/profiles/:profile/films", get(list_films))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session Actions
// ============================================================

async fn send_action(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<Action>, JsonRejection>,
) -> Result<Json<ActionResponse>, AppError> {
    if session_id.chars().count() > MAX_SESSION_ID_LEN {
        return Err(AppError::BadRequest(format!(
            "Session id longer than {MAX_SESSION_ID_LEN} characters"
        )));
    }
    let Json(action) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    tracing::debug!(session_id = %session_id, action = action.name(), "Action received");

    let replies = state
        .sessions
        .dispatch(&session_id, action)
        .await
        .map_err(|e| match e {
            SessionError::Store(e) => AppError::Internal(format!("Storage failure: {e}")),
            e @ SessionError::Closed(_) => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(ActionResponse { replies }))
}

// ============================================================
// Collection View
// ============================================================

/// Read-only listing of any configured profile's films.
///
/// This does not go through a session, so the conversation's profile
/// selection does not gate it. Profiles are labels, not accounts; expose
/// this route only where every caller may read every collection.
async fn list_films(
    State(state): State<AppState>,
    Path(profile): Path<String>,
    Query(query): Query<FilmsQuery>,
) -> Result<Json<FilmsResponse>, AppError> {
    let Some(profile) = state
        .sessions
        .profiles()
        .iter()
        .find(|p| p.to_lowercase() == profile.to_lowercase())
        .cloned()
    else {
        return Err(AppError::NotFound(format!("Unknown profile: {profile}")));
    };

    let store = state.sessions.store();
    let films = if query.watched {
        store.list_watched(&profile)
    } else {
        store.list_all(&profile)
    }
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(FilmsResponse { profile, films }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("filmoteka ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
