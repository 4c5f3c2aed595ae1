//! Session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::protocol::constants::{MAX_PLAYERS, TIME_LIMIT_SECONDS};
use crate::question::MathConfig;

/// Session lifecycle status
///
/// Transitions are monotonic: lobby → (active ⇄ paused)* → ended. `Draft`
/// exists for completeness; the REST surface creates sessions directly in
/// `Lobby`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Draft,
    Lobby,
    Active,
    Paused,
    Ended,
}

impl SessionStatus {
    /// Whether the state machine allows moving to `next`
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Draft, Lobby)
                | (Lobby, Active)
                | (Active, Paused)
                | (Paused, Active)
                | (Active, Ended)
                | (Paused, Ended)
        )
    }

    /// Joins are accepted while the session is in the lobby or running
    pub fn accepts_joins(self) -> bool {
        matches!(self, SessionStatus::Lobby | SessionStatus::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Draft => "draft",
            SessionStatus::Lobby => "lobby",
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Ended => "ended",
        }
    }
}

/// The ten supported arcade games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    AsteroidDodge,
    PlatformPanic,
    SnakeRace,
    BrickBreaker,
    TowerClimb,
    SpaceShooter,
    MazeRunner,
    RhythmTap,
    FruitSlice,
    TankBattle,
}

impl GameType {
    pub fn as_str(self) -> &'static str {
        match self {
            GameType::AsteroidDodge => "asteroid_dodge",
            GameType::PlatformPanic => "platform_panic",
            GameType::SnakeRace => "snake_race",
            GameType::BrickBreaker => "brick_breaker",
            GameType::TowerClimb => "tower_climb",
            GameType::SpaceShooter => "space_shooter",
            GameType::MazeRunner => "maze_runner",
            GameType::RhythmTap => "rhythm_tap",
            GameType::FruitSlice => "fruit_slice",
            GameType::TankBattle => "tank_battle",
        }
    }
}

/// How the teacher participates in their own session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeacherMode {
    Monitor,
    Play,
}

/// Where questions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSourceKind {
    Math,
    Bank,
}

/// Per-session configuration fixed at creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub time_limit_seconds: u32,
    pub max_players: usize,
    pub question_source: QuestionSourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub math_config: Option<MathConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_ids: Option<Vec<i64>>,
}

impl SessionConfig {
    /// Validate ranges and source/config coherence
    pub fn validate(&self) -> Result<()> {
        if !TIME_LIMIT_SECONDS.contains(&self.time_limit_seconds) {
            return Err(ProtocolError::InvalidConfig(format!(
                "time_limit_seconds {} outside {}..={}",
                self.time_limit_seconds,
                TIME_LIMIT_SECONDS.start(),
                TIME_LIMIT_SECONDS.end()
            )));
        }
        if !MAX_PLAYERS.contains(&self.max_players) {
            return Err(ProtocolError::InvalidConfig(format!(
                "max_players {} outside {}..={}",
                self.max_players,
                MAX_PLAYERS.start(),
                MAX_PLAYERS.end()
            )));
        }
        match self.question_source {
            QuestionSourceKind::Math => {
                if let Some(math) = &self.math_config {
                    math.validate()?;
                }
            }
            QuestionSourceKind::Bank => {
                if self.bank_ids.as_ref().is_none_or(|ids| ids.is_empty()) {
                    return Err(ProtocolError::InvalidConfig(
                        "bank question source requires bank_ids".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Point-in-time view of a session, embedded in host/player snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub code: String,
    pub status: SessionStatus,
    pub game_type: GameType,
    pub teacher_mode: TeacherMode,
    pub time_limit_seconds: u32,
    pub max_players: usize,
    pub player_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Public preview returned by `GET /sessions/{code}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPreview {
    pub code: String,
    pub status: SessionStatus,
    pub game_type: GameType,
    pub player_count: usize,
    pub max_players: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            time_limit_seconds: 600,
            max_players: 30,
            question_source: QuestionSourceKind::Math,
            math_config: None,
            bank_ids: None,
        }
    }

    #[test]
    fn status_transitions_form_the_spec_machine() {
        use SessionStatus::*;
        assert!(Lobby.can_transition_to(Active));
        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(Active.can_transition_to(Ended));
        assert!(Paused.can_transition_to(Ended));

        // No path back to lobby, no restart after end
        assert!(!Active.can_transition_to(Lobby));
        assert!(!Paused.can_transition_to(Lobby));
        assert!(!Ended.can_transition_to(Active));
        assert!(!Ended.can_transition_to(Lobby));
        assert!(!Lobby.can_transition_to(Paused));
    }

    #[test]
    fn config_validation_enforces_ranges() {
        assert!(config().validate().is_ok());

        let mut c = config();
        c.time_limit_seconds = 120;
        assert!(c.validate().is_err());

        let mut c = config();
        c.max_players = 101;
        assert!(c.validate().is_err());

        let mut c = config();
        c.question_source = QuestionSourceKind::Bank;
        c.bank_ids = None;
        assert!(c.validate().is_err());
        c.bank_ids = Some(vec![1]);
        assert!(c.validate().is_ok());
    }
}
