//! Session REST handlers

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use arcade_core::question::MathConfig;
use arcade_core::types::{
    GameType, PlayerInfo, QuestionSourceKind, SessionConfig, SessionPreview, SessionStatus,
    TeacherMode,
};

use crate::db::{results as db_results, sessions as db_sessions};
use crate::handlers::ApiError;
use crate::session::{JoinError, SessionResults};
use crate::state::{AppState, CreateError};

/// Verify the teacher bearer token and return the teacher id
fn require_teacher(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    state
        .auth
        .verify_bearer(header)
        .map_err(|e| ApiError::unauthorized(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub game_type: GameType,
    pub teacher_mode: TeacherMode,
    pub time_limit_minutes: u32,
    pub max_players: usize,
    pub question_source: QuestionSourceKind,
    #[serde(default)]
    pub question_config: Option<MathConfig>,
    #[serde(default)]
    pub question_bank_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub id: String,
    #[serde(flatten)]
    pub preview: SessionPreview,
}

/// POST /api/reviewarcade/sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<SessionCreated>, ApiError> {
    let teacher_id = require_teacher(&state, &headers)?;

    let config = SessionConfig {
        time_limit_seconds: request.time_limit_minutes.saturating_mul(60),
        max_players: request.max_players,
        question_source: request.question_source,
        math_config: request.question_config,
        bank_ids: request.question_bank_ids,
    };

    let handle = state
        .registry
        .create(
            &state.db,
            state.timings,
            teacher_id,
            request.teacher_mode,
            request.game_type,
            config,
            &state.config.questions.math,
        )
        .await
        .map_err(|e| match e {
            CreateError::Capacity => ApiError::conflict("session limit reached"),
            CreateError::InvalidConfig(detail) => ApiError::bad_request(detail),
            CreateError::Internal(err) => err.into(),
        })?;

    let preview = handle
        .preview()
        .await
        .ok_or_else(|| ApiError::not_found("session vanished"))?;
    Ok(Json(SessionCreated {
        id: handle.id.clone(),
        preview,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/reviewarcade/sessions?limit=N
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<db_sessions::SessionRow>>, ApiError> {
    let teacher_id = require_teacher(&state, &headers)?;
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let rows = db_sessions::list_by_teacher(state.db.pool(), &teacher_id, limit).await?;
    Ok(Json(rows))
}

/// GET /api/reviewarcade/sessions/{code}
pub async fn preview_session(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<SessionPreview>, ApiError> {
    if let Some(handle) = state.registry.lookup(&code) {
        let preview = handle
            .preview()
            .await
            .ok_or_else(|| ApiError::not_found("unknown session"))?;
        if preview.status == SessionStatus::Ended {
            return Err(ApiError::gone("session ended"));
        }
        return Ok(Json(preview));
    }

    // Reaped sessions still answer 410 from the store
    match db_sessions::latest_status_by_code(state.db.pool(), &code.to_uppercase()).await? {
        Some(status) if status == SessionStatus::Ended.as_str() => {
            Err(ApiError::gone("session ended"))
        }
        _ => Err(ApiError::not_found("unknown session")),
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub name: String,
}

/// POST /api/reviewarcade/sessions/{code}/join
pub async fn join_session(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<PlayerInfo>, ApiError> {
    let handle = state
        .registry
        .lookup(&code)
        .ok_or_else(|| ApiError::not_found("unknown session"))?;
    join(&handle, request.name, false).await
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinTeacherRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// POST /api/reviewarcade/sessions/{code}/join-teacher
pub async fn join_teacher(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(request): Json<JoinTeacherRequest>,
) -> Result<Json<PlayerInfo>, ApiError> {
    let teacher_id = require_teacher(&state, &headers)?;
    let handle = state
        .registry
        .lookup(&code)
        .ok_or_else(|| ApiError::not_found("unknown session"))?;
    if handle.teacher_id != teacher_id {
        return Err(ApiError::forbidden("not the session owner"));
    }
    let name = request.name.unwrap_or_else(|| "Teacher".to_string());
    join(&handle, name, true).await
}

async fn join(
    handle: &crate::session::SessionHandle,
    name: String,
    is_teacher: bool,
) -> Result<Json<PlayerInfo>, ApiError> {
    match handle.join(name, is_teacher).await {
        None => Err(ApiError::not_found("unknown session")),
        Some(Err(JoinError::Full)) => Err(ApiError::conflict("full")),
        Some(Err(JoinError::NotAccepting)) => Err(ApiError::conflict("not accepting")),
        Some(Err(JoinError::BadName(detail))) => Err(ApiError::bad_request(detail)),
        Some(Ok(player)) => Ok(Json(player)),
    }
}

/// GET /api/reviewarcade/sessions/{id}/results
pub async fn session_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SessionResults>, ApiError> {
    let teacher_id = require_teacher(&state, &headers)?;

    // Live actor first: it serves results between end and reap
    if let Some(handle) = state.registry.lookup_by_id(&id) {
        if handle.teacher_id != teacher_id {
            return Err(ApiError::forbidden("not the session owner"));
        }
        return match handle.results().await {
            Some(Some(results)) => Ok(Json(results)),
            Some(None) => Err(ApiError::conflict("session has not ended")),
            None => Err(ApiError::not_found("unknown session")),
        };
    }

    // Otherwise the stored row
    let owner = db_sessions::session_owner(state.db.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::not_found("unknown session"))?;
    if owner != teacher_id {
        return Err(ApiError::forbidden("not the session owner"));
    }
    match db_results::get_results(state.db.pool(), &id).await? {
        Some(results) => Ok(Json(results)),
        None => Err(ApiError::conflict("session has not ended")),
    }
}
