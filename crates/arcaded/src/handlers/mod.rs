//! HTTP surface
//!
//! Stateless adapter between axum and the registry/session actors. REST
//! errors are `{detail}` JSON bodies; the WebSocket upgrade hands the
//! socket to the connection module.

pub mod sessions;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::connection;
use crate::state::AppState;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/reviewarcade/sessions",
            post(sessions::create_session).get(sessions::list_sessions),
        )
        .route(
            "/api/reviewarcade/sessions/{code}",
            get(sessions::preview_session),
        )
        .route(
            "/api/reviewarcade/sessions/{code}/join",
            post(sessions::join_session),
        )
        .route(
            "/api/reviewarcade/sessions/{code}/join-teacher",
            post(sessions::join_teacher),
        )
        .route(
            "/api/reviewarcade/sessions/{code}/results",
            get(sessions::session_results),
        )
        .route("/ws/reviewarcade/{code}", get(connection::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// REST error with a `{detail}` body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, detail)
    }

    pub fn gone(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "detail": self.detail }));
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:#}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}
