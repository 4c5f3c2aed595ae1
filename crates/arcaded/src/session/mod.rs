//! Session actors
//!
//! Each live session is owned by exactly one actor task. All mutation
//! happens on that task; connections, the registry, and the REST surface
//! talk to it through its inbox.

pub mod actor;
pub mod conn;

pub use actor::spawn;
pub use conn::{conn_channel, ConnHandle, ConnId, SendOutcome};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use arcade_core::leaderboard::{Award, LeaderboardRow};
use arcade_core::protocol::ClientMessage;
use arcade_core::types::{PlayerInfo, PlayerSnapshot, SessionPreview, SessionSnapshot};

/// Why a REST join was refused
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("session is full")]
    Full,

    #[error("session is not accepting players")]
    NotAccepting,

    #[error("{0}")]
    BadName(String),
}

/// Final results computed when a session ends, broadcast, served over REST,
/// and persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResults {
    pub session: SessionSnapshot,
    pub final_leaderboard: Vec<LeaderboardRow>,
    pub awards: Vec<Award>,
    pub players: Vec<PlayerSnapshot>,
}

/// Inbox messages for a session actor
pub enum SessionCommand {
    /// Host WebSocket attached with a verified teacher id
    HostConnected { conn: ConnHandle, teacher_id: String },

    /// Player WebSocket attached with its opaque token, validated by the
    /// actor against its player records
    PlayerConnected { conn: ConnHandle, token: String },

    /// Reader task ended; detach the connection
    Disconnect { conn_id: ConnId },

    /// Decoded client frame from an attached connection
    Frame {
        conn_id: ConnId,
        message: ClientMessage,
    },

    /// REST join request
    Join {
        name: String,
        is_teacher: bool,
        reply: oneshot::Sender<Result<PlayerInfo, JoinError>>,
    },

    /// REST preview request
    Preview {
        reply: oneshot::Sender<SessionPreview>,
    },

    /// REST results request; `None` until the session has ended
    Results {
        reply: oneshot::Sender<Option<SessionResults>>,
    },
}

/// Cloneable handle to a session actor
#[derive(Clone, Debug)]
pub struct SessionHandle {
    pub id: String,
    pub code: String,
    pub teacher_id: String,
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(
        id: String,
        code: String,
        teacher_id: String,
        tx: mpsc::Sender<SessionCommand>,
    ) -> Self {
        Self {
            id,
            code,
            teacher_id,
            tx,
        }
    }

    /// Post a command; false if the actor is gone
    pub async fn send(&self, command: SessionCommand) -> bool {
        self.tx.send(command).await.is_ok()
    }

    /// REST join; `None` if the actor is gone
    pub async fn join(&self, name: String, is_teacher: bool) -> Option<Result<PlayerInfo, JoinError>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Join {
                name,
                is_teacher,
                reply,
            })
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Public preview; `None` if the actor is gone
    pub async fn preview(&self) -> Option<SessionPreview> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(SessionCommand::Preview { reply }).await.ok()?;
        rx.await.ok()
    }

    /// Final results; outer `None` if the actor is gone, inner `None` until
    /// the session has ended
    pub async fn results(&self) -> Option<Option<SessionResults>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(SessionCommand::Results { reply }).await.ok()?;
        rx.await.ok()
    }
}
