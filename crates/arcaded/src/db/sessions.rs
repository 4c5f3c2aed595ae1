//! Session row operations

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use arcade_core::types::SessionStatus;

/// Stored session row, returned by the teacher listing endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionRow {
    pub id: String,
    pub code: String,
    pub game_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Insert the row at session creation
pub async fn insert_session(
    pool: &SqlitePool,
    id: &str,
    code: &str,
    teacher_id: &str,
    game_type: &str,
    created_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO sessions (id, code, teacher_id, game_type, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(code)
    .bind(teacher_id)
    .bind(game_type)
    .bind(SessionStatus::Lobby.as_str())
    .bind(created_at.timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

/// Finalize the row when the session ends
pub async fn finalize_session(
    pool: &SqlitePool,
    id: &str,
    started_at: Option<DateTime<Utc>>,
    ended_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE sessions SET status = ?, started_at = ?, ended_at = ? WHERE id = ?")
        .bind(SessionStatus::Ended.as_str())
        .bind(started_at.map(|t| t.timestamp()))
        .bind(ended_at.timestamp())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Latest sessions owned by a teacher, newest first
pub async fn list_by_teacher(
    pool: &SqlitePool,
    teacher_id: &str,
    limit: i64,
) -> Result<Vec<SessionRow>> {
    let rows: Vec<(String, String, String, String, i64, Option<i64>, Option<i64>)> =
        sqlx::query_as(
            "SELECT id, code, game_type, status, created_at, started_at, ended_at
             FROM sessions WHERE teacher_id = ?
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(teacher_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(
            |(id, code, game_type, status, created_at, started_at, ended_at)| SessionRow {
                id,
                code,
                game_type,
                status,
                created_at: timestamp(created_at),
                started_at: started_at.map(timestamp),
                ended_at: ended_at.map(timestamp),
            },
        )
        .collect())
}

/// Status of the most recently created session with this code, if any.
/// Backs the 404-vs-410 distinction after a live session is reaped.
pub async fn latest_status_by_code(pool: &SqlitePool, code: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT status FROM sessions WHERE code = ? ORDER BY created_at DESC LIMIT 1",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(s,)| s))
}

/// Teacher owning a stored session, if any
pub async fn session_owner(pool: &SqlitePool, id: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT teacher_id FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(t,)| t))
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
