//! Final session results storage
//!
//! One row per ended session: the final session snapshot, the leaderboard,
//! the awards, and the per-player stats as separate JSON columns so each
//! facet stays independently queryable.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::session::SessionResults;

/// Store the final results for an ended session
pub async fn insert_results(pool: &SqlitePool, results: &SessionResults) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO session_results
            (session_id, session, leaderboard, awards, player_stats, stored_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&results.session.id)
    .bind(serde_json::to_string(&results.session)?)
    .bind(serde_json::to_string(&results.final_leaderboard)?)
    .bind(serde_json::to_string(&results.awards)?)
    .bind(serde_json::to_string(&results.players)?)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch stored results for a session, if it ended and was persisted
pub async fn get_results(pool: &SqlitePool, session_id: &str) -> Result<Option<SessionResults>> {
    let row: Option<(String, String, String, String)> = sqlx::query_as(
        "SELECT session, leaderboard, awards, player_stats
         FROM session_results WHERE session_id = ?",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    let Some((session, leaderboard, awards, player_stats)) = row else {
        return Ok(None);
    };
    let corrupt = || format!("Corrupt results row for session {}", session_id);
    Ok(Some(SessionResults {
        session: serde_json::from_str(&session).with_context(corrupt)?,
        final_leaderboard: serde_json::from_str(&leaderboard).with_context(corrupt)?,
        awards: serde_json::from_str(&awards).with_context(corrupt)?,
        players: serde_json::from_str(&player_stats).with_context(corrupt)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{sessions as db_sessions, Database};
    use arcade_core::leaderboard::LeaderboardRow;
    use arcade_core::types::{
        GameType, PlayerSnapshot, PlayerStats, SessionSnapshot, SessionStatus, TeacherMode,
    };

    fn results() -> SessionResults {
        SessionResults {
            session: SessionSnapshot {
                id: "s1".to_string(),
                code: "ABCDEF".to_string(),
                status: SessionStatus::Ended,
                game_type: GameType::SnakeRace,
                teacher_mode: TeacherMode::Monitor,
                time_limit_seconds: 600,
                max_players: 30,
                player_count: 1,
                remaining_seconds: None,
                created_at: Utc::now(),
                started_at: Some(Utc::now()),
                ended_at: Some(Utc::now()),
            },
            final_leaderboard: vec![LeaderboardRow {
                rank: 1,
                player_id: "p1".to_string(),
                display_name: "Ada".to_string(),
                is_teacher: false,
                total_score: 150,
                best_streak: 3,
            }],
            awards: vec![],
            players: vec![PlayerSnapshot {
                player_id: "p1".to_string(),
                display_name: "Ada".to_string(),
                is_teacher: false,
                connected: false,
                total_score: 150,
                current_streak: 3,
                best_streak: 3,
                streak_multiplier: 1.25,
                comeback_credits: 2,
                stats: PlayerStats::default(),
            }],
        }
    }

    #[tokio::test]
    async fn results_round_trip() {
        let db = Database::in_memory().await.unwrap();
        db.init_schema().await.unwrap();
        db_sessions::insert_session(db.pool(), "s1", "ABCDEF", "t1", "snake_race", Utc::now())
            .await
            .unwrap();

        let stored = results();
        insert_results(db.pool(), &stored).await.unwrap();

        let loaded = get_results(db.pool(), "s1").await.unwrap().unwrap();
        assert_eq!(loaded.session.id, "s1");
        assert_eq!(loaded.session.status, SessionStatus::Ended);
        assert_eq!(loaded.final_leaderboard, stored.final_leaderboard);
        assert_eq!(loaded.players.len(), 1);
        assert_eq!(loaded.players[0].total_score, 150);

        assert!(get_results(db.pool(), "nope").await.unwrap().is_none());
    }
}
