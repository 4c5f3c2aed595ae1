//! Wire messages
//!
//! Every WebSocket frame is a JSON object tagged by a string `type`. The two
//! directions carry disjoint tag sets; the codec rejects a tag that does not
//! belong to the direction being decoded.

use serde::{Deserialize, Serialize};

use crate::leaderboard::{Award, LeaderboardRow};
use crate::types::{PlayerSnapshot, PublicQuestion, SessionSnapshot};

/// Role claimed by a connection in its `init` frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WsRole {
    Host,
    Player,
}

/// Error kinds surfaced to clients, on the wire as snake_case codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AuthRequired,
    AuthInvalid,
    NotFound,
    Forbidden,
    Full,
    NotAccepting,
    BadMessage,
    PendingQuestion,
    Expired,
    SlowConsumer,
    HeartbeatTimeout,
    Internal,
}

/// Close reasons sent in the WebSocket close frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    AuthRequired,
    AuthInvalid,
    SlowConsumer,
    HeartbeatTimeout,
    Superseded,
    SessionEnded,
    Internal,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::AuthRequired => "auth_required",
            CloseReason::AuthInvalid => "auth_invalid",
            CloseReason::SlowConsumer => "slow_consumer",
            CloseReason::HeartbeatTimeout => "heartbeat_timeout",
            CloseReason::Superseded => "superseded",
            CloseReason::SessionEnded => "session_ended",
            CloseReason::Internal => "internal",
        }
    }

    /// WebSocket close code: policy violations use 1008, everything else 1000
    pub fn ws_code(self) -> u16 {
        match self {
            CloseReason::AuthRequired | CloseReason::AuthInvalid => 1008,
            CloseReason::Internal => 1011,
            _ => 1000,
        }
    }
}

/// Client → server messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First frame on any connection; credential depends on role
    Init { role: WsRole, token: String },

    /// Player avatar died with the given run score
    Death {
        score: i64,
        #[serde(default)]
        metadata: Option<serde_json::Value>,
    },

    /// Answer to the pending question
    Answer {
        question_id: String,
        answer_index: u8,
        time_ms: u64,
    },

    /// Informational live score, never credited
    ScoreUpdate { score: i64 },

    /// Opaque game event forwarded to the host
    SpecialEvent { event: serde_json::Value },

    StartSession,
    PauseSession,
    ResumeSession,
    EndSession,
    Pong,
}

impl ClientMessage {
    /// Recognized client → server tags
    pub fn is_known_type(tag: &str) -> bool {
        matches!(
            tag,
            "init"
                | "death"
                | "answer"
                | "score_update"
                | "special_event"
                | "start_session"
                | "pause_session"
                | "resume_session"
                | "end_session"
                | "pong"
        )
    }

    /// Tag for logging
    pub fn tag(&self) -> &'static str {
        match self {
            ClientMessage::Init { .. } => "init",
            ClientMessage::Death { .. } => "death",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::ScoreUpdate { .. } => "score_update",
            ClientMessage::SpecialEvent { .. } => "special_event",
            ClientMessage::StartSession => "start_session",
            ClientMessage::PauseSession => "pause_session",
            ClientMessage::ResumeSession => "resume_session",
            ClientMessage::EndSession => "end_session",
            ClientMessage::Pong => "pong",
        }
    }
}

/// Server → client messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full snapshot sent to the host on attach
    HostState {
        session: SessionSnapshot,
        players: Vec<PlayerSnapshot>,
        leaderboard: Vec<LeaderboardRow>,
    },

    /// Full snapshot sent to a player on attach or reconnect
    PlayerState {
        session: SessionSnapshot,
        you: PlayerSnapshot,
        pending_question: Option<PublicQuestion>,
        leaderboard: Vec<LeaderboardRow>,
    },

    PlayerConnected {
        player_id: String,
        display_name: String,
        player_count: usize,
    },

    PlayerDisconnected {
        player_id: String,
        display_name: String,
        player_count: usize,
    },

    SessionStarted {
        game_type: crate::types::GameType,
        time_limit_seconds: u32,
    },

    SessionPaused,

    SessionResumed { remaining_seconds: u64 },

    SessionEnded {
        final_leaderboard: Vec<LeaderboardRow>,
        awards: Vec<Award>,
    },

    /// Question issued after a death; never carries the correct index
    Question {
        #[serde(flatten)]
        question: PublicQuestion,
    },

    AnswerCorrect {
        bonus_earned: i64,
        total_score: i64,
        current_streak: u32,
        streak_multiplier: f64,
        comeback_credits: u8,
        comeback_start_score: i64,
        respawn: bool,
    },

    AnswerWrong { correct_index: u8, respawn: bool },

    LeaderboardUpdate {
        leaderboard: Vec<LeaderboardRow>,
        #[serde(skip_serializing_if = "Option::is_none")]
        your_rank: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        your_score: Option<i64>,
    },

    LiveEvent {
        player_id: String,
        display_name: String,
        event: serde_json::Value,
    },

    PlayerScoreUpdate { player_id: String, score: i64 },

    Ping { t: u64 },

    Error { code: ErrorKind, message: String },
}

impl ServerMessage {
    /// Recognized server → client tags
    pub fn is_known_type(tag: &str) -> bool {
        matches!(
            tag,
            "host_state"
                | "player_state"
                | "player_connected"
                | "player_disconnected"
                | "session_started"
                | "session_paused"
                | "session_resumed"
                | "session_ended"
                | "question"
                | "answer_correct"
                | "answer_wrong"
                | "leaderboard_update"
                | "live_event"
                | "player_score_update"
                | "ping"
                | "error"
        )
    }

    /// Shorthand for the common error reply
    pub fn error(code: ErrorKind, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }
}
