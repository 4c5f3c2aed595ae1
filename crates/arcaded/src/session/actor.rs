//! The session actor
//!
//! Single-writer owner of one session: the state machine, the players map,
//! the timer, and all broadcasts. Commands arrive on the inbox; outbound
//! messages go to connection handles through a flush queue so ordering per
//! subscriber always matches acceptance order.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use uuid::Uuid;

use arcade_core::leaderboard::{self, AwardCandidate, LeaderboardRow, PlayerStanding};
use arcade_core::protocol::{ClientMessage, CloseReason, ErrorKind, ServerMessage};
use arcade_core::question::QuestionSource;
use arcade_core::scoring::ScoreState;
use arcade_core::types::{
    dedup_display_name, normalize_display_name, GameType, PlayerInfo, PlayerSnapshot,
    PlayerStats, Question, SessionConfig, SessionPreview, SessionSnapshot, SessionStatus,
    TeacherMode,
};

use crate::auth;
use crate::config::SessionTimings;
use crate::db::{results as db_results, sessions as db_sessions, Database};
use crate::session::conn::{ConnHandle, ConnId, SendOutcome};
use crate::session::{JoinError, SessionCommand, SessionHandle, SessionResults};

/// Inbox depth; senders back off when the actor is saturated
const INBOX_SIZE: usize = 256;

/// Everything needed to start a session actor
pub struct SessionParams {
    pub id: String,
    pub code: String,
    pub teacher_id: String,
    pub teacher_mode: TeacherMode,
    pub game_type: GameType,
    pub config: SessionConfig,
    pub source: QuestionSource,
    pub timings: SessionTimings,
    pub db: Option<Database>,
    pub reaper: mpsc::UnboundedSender<String>,
}

/// Spawn the actor task and return its handle
pub fn spawn(params: SessionParams) -> SessionHandle {
    let (tx, rx) = mpsc::channel(INBOX_SIZE);
    let handle = SessionHandle::new(
        params.id.clone(),
        params.code.clone(),
        params.teacher_id.clone(),
        tx,
    );
    let actor = SessionActor::new(params);
    tokio::spawn(actor.run(rx));
    handle
}

/// What a connection is bound to after a successful `init`
#[derive(Debug, Clone, Copy)]
enum Binding {
    Host,
    Player(usize),
}

struct ConnState {
    handle: ConnHandle,
    binding: Binding,
    last_seen: Instant,
}

struct PendingQuestion {
    question: Question,
    issued_at: Instant,
}

/// Per-player state, owned by the actor. Entries are never removed, so
/// indexes are stable and double as join order.
struct PlayerEntry {
    id: String,
    display_name: String,
    is_teacher: bool,
    conn: Option<ConnId>,
    connected: bool,
    score: ScoreState,
    stats: PlayerStats,
    served: Vec<String>,
    pending: Option<PendingQuestion>,
    first_run_score: Option<i64>,
    last_run_score: Option<i64>,
    credits_earned: u32,
    credits_used: u32,
}

struct SessionActor {
    id: String,
    code: String,
    teacher_id: String,
    teacher_mode: TeacherMode,
    game_type: GameType,
    config: SessionConfig,
    timings: SessionTimings,

    status: SessionStatus,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    timer_end: Option<Instant>,
    remaining_on_pause: Option<Duration>,
    reap_at: Option<Instant>,
    stopped: bool,

    players: Vec<PlayerEntry>,
    by_token: HashMap<String, usize>,
    conns: HashMap<ConnId, ConnState>,
    host: Option<ConnId>,

    source: QuestionSource,
    results: Option<SessionResults>,
    last_leaderboard_view: HashMap<usize, String>,
    outbox: Vec<(ConnId, ServerMessage)>,

    db: Option<Database>,
    reaper: mpsc::UnboundedSender<String>,
}

impl SessionActor {
    fn new(params: SessionParams) -> Self {
        Self {
            id: params.id,
            code: params.code,
            teacher_id: params.teacher_id,
            teacher_mode: params.teacher_mode,
            game_type: params.game_type,
            config: params.config,
            timings: params.timings,
            status: SessionStatus::Lobby,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            timer_end: None,
            remaining_on_pause: None,
            reap_at: None,
            stopped: false,
            players: Vec::new(),
            by_token: HashMap::new(),
            conns: HashMap::new(),
            host: None,
            source: params.source,
            results: None,
            last_leaderboard_view: HashMap::new(),
            outbox: Vec::new(),
            db: params.db,
            reaper: params.reaper,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<SessionCommand>) {
        tracing::info!("Session {} actor started", self.code);
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = tick.tick() => self.on_tick(),
            }
            self.flush();
            if self.stopped {
                break;
            }
        }
        tracing::info!("Session {} actor stopped", self.code);
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::HostConnected { conn, teacher_id } => {
                self.on_host_connected(conn, teacher_id)
            }
            SessionCommand::PlayerConnected { conn, token } => {
                self.on_player_connected(conn, token)
            }
            SessionCommand::Disconnect { conn_id } => self.detach(conn_id),
            SessionCommand::Frame { conn_id, message } => self.on_frame(conn_id, message),
            SessionCommand::Join {
                name,
                is_teacher,
                reply,
            } => {
                let _ = reply.send(self.on_join(name, is_teacher));
            }
            SessionCommand::Preview { reply } => {
                let _ = reply.send(self.preview());
            }
            SessionCommand::Results { reply } => {
                let _ = reply.send(self.results.clone());
            }
        }
    }

    // ---- connection lifecycle ----

    fn on_host_connected(&mut self, conn: ConnHandle, teacher_id: String) {
        if teacher_id != self.teacher_id {
            tracing::warn!("Session {}: host connect by foreign teacher", self.code);
            conn.send(ServerMessage::error(
                ErrorKind::AuthInvalid,
                "not the session owner",
            ));
            conn.close(CloseReason::AuthInvalid);
            return;
        }

        // A fresh host connection supersedes any prior one
        if let Some(old) = self.host.take() {
            self.drop_conn(old, CloseReason::Superseded);
        }

        let conn_id = conn.id;
        self.conns.insert(
            conn_id,
            ConnState {
                handle: conn,
                binding: Binding::Host,
                last_seen: Instant::now(),
            },
        );
        self.host = Some(conn_id);
        tracing::info!("Session {}: host attached (conn {})", self.code, conn_id);

        let snapshot = ServerMessage::HostState {
            session: self.session_snapshot(),
            players: (0..self.players.len())
                .map(|i| self.player_snapshot(i))
                .collect(),
            leaderboard: self.leaderboard(),
        };
        self.queue(conn_id, snapshot);
    }

    fn on_player_connected(&mut self, conn: ConnHandle, token: String) {
        let Some(&idx) = self.by_token.get(&token) else {
            tracing::warn!("Session {}: player connect with bad token", self.code);
            conn.send(ServerMessage::error(
                ErrorKind::AuthInvalid,
                "unknown player token",
            ));
            conn.close(CloseReason::AuthInvalid);
            return;
        };

        // Reconnect replaces any previous connection for this player
        if let Some(old) = self.players[idx].conn {
            self.drop_conn(old, CloseReason::Superseded);
        }

        let conn_id = conn.id;
        self.conns.insert(
            conn_id,
            ConnState {
                handle: conn,
                binding: Binding::Player(idx),
                last_seen: Instant::now(),
            },
        );
        {
            let player = &mut self.players[idx];
            player.conn = Some(conn_id);
            player.connected = true;
        }
        tracing::info!(
            "Session {}: player {} attached (conn {})",
            self.code,
            self.players[idx].display_name,
            conn_id
        );

        let snapshot = ServerMessage::PlayerState {
            session: self.session_snapshot(),
            you: self.player_snapshot(idx),
            pending_question: self.live_pending(idx),
            leaderboard: self.leaderboard(),
        };
        self.queue(conn_id, snapshot);

        let announce = ServerMessage::PlayerConnected {
            player_id: self.players[idx].id.clone(),
            display_name: self.players[idx].display_name.clone(),
            player_count: self.players.len(),
        };
        self.queue_host(announce);
    }

    /// Detach a connection that is already gone (reader ended or send
    /// failed). Player state is preserved.
    fn detach(&mut self, conn_id: ConnId) {
        let Some(state) = self.conns.remove(&conn_id) else {
            return;
        };
        match state.binding {
            Binding::Host => {
                if self.host == Some(conn_id) {
                    self.host = None;
                }
                tracing::info!("Session {}: host detached", self.code);
            }
            Binding::Player(idx) => {
                let (player_id, display_name) = {
                    let player = &mut self.players[idx];
                    if player.conn == Some(conn_id) {
                        player.conn = None;
                        player.connected = false;
                    }
                    (player.id.clone(), player.display_name.clone())
                };
                tracing::info!("Session {}: player {} detached", self.code, display_name);
                let player_count = self.players.len();
                self.queue_host(ServerMessage::PlayerDisconnected {
                    player_id,
                    display_name,
                    player_count,
                });
            }
        }
    }

    /// Close a connection with a reason, then detach it
    fn drop_conn(&mut self, conn_id: ConnId, reason: CloseReason) {
        if let Some(state) = self.conns.get(&conn_id) {
            state.handle.close(reason);
        }
        self.detach(conn_id);
    }

    // ---- inbound frames ----

    fn on_frame(&mut self, conn_id: ConnId, message: ClientMessage) {
        let Some(state) = self.conns.get_mut(&conn_id) else {
            return;
        };
        state.last_seen = Instant::now();
        let binding = state.binding;

        match (binding, message) {
            (_, ClientMessage::Pong) => {}
            (_, ClientMessage::Init { .. }) => {
                self.queue(
                    conn_id,
                    ServerMessage::error(ErrorKind::BadMessage, "connection already initialized"),
                );
            }

            (Binding::Host, ClientMessage::StartSession) => self.on_start(conn_id),
            (Binding::Host, ClientMessage::PauseSession) => self.on_pause(conn_id),
            (Binding::Host, ClientMessage::ResumeSession) => self.on_resume(conn_id),
            (Binding::Host, ClientMessage::EndSession) => self.on_end_command(conn_id),

            (Binding::Player(idx), ClientMessage::Death { score, metadata }) => {
                self.on_death(idx, score, metadata)
            }
            (
                Binding::Player(idx),
                ClientMessage::Answer {
                    question_id,
                    answer_index,
                    time_ms,
                },
            ) => self.on_answer(idx, question_id, answer_index, time_ms),
            (Binding::Player(idx), ClientMessage::ScoreUpdate { score }) => {
                self.on_score_update(idx, score)
            }
            (Binding::Player(idx), ClientMessage::SpecialEvent { event }) => {
                self.on_special_event(idx, event)
            }

            (Binding::Host, _) => {
                self.queue(
                    conn_id,
                    ServerMessage::error(ErrorKind::Forbidden, "player message on host connection"),
                );
            }
            (Binding::Player(_), _) => {
                self.queue(
                    conn_id,
                    ServerMessage::error(ErrorKind::Forbidden, "host command on player connection"),
                );
            }
        }
    }

    // ---- state machine ----

    fn on_start(&mut self, host_conn: ConnId) {
        if self.status != SessionStatus::Lobby {
            self.queue(
                host_conn,
                ServerMessage::error(
                    ErrorKind::BadMessage,
                    format!("cannot start from {}", self.status.as_str()),
                ),
            );
            return;
        }
        if self.teacher_mode == TeacherMode::Play && self.players.is_empty() {
            self.queue(
                host_conn,
                ServerMessage::error(ErrorKind::BadMessage, "play mode needs at least one player"),
            );
            return;
        }

        self.status = SessionStatus::Active;
        self.started_at = Some(Utc::now());
        self.timer_end =
            Some(Instant::now() + Duration::from_secs(self.config.time_limit_seconds as u64));
        tracing::info!(
            "Session {} started ({} players, {}s)",
            self.code,
            self.players.len(),
            self.config.time_limit_seconds
        );
        self.broadcast(ServerMessage::SessionStarted {
            game_type: self.game_type,
            time_limit_seconds: self.config.time_limit_seconds,
        });
    }

    fn on_pause(&mut self, host_conn: ConnId) {
        if self.status != SessionStatus::Active {
            self.queue(
                host_conn,
                ServerMessage::error(
                    ErrorKind::BadMessage,
                    format!("cannot pause from {}", self.status.as_str()),
                ),
            );
            return;
        }
        let now = Instant::now();
        let remaining = self
            .timer_end
            .map(|end| end.saturating_duration_since(now))
            .unwrap_or_default();
        self.remaining_on_pause = Some(remaining);
        self.timer_end = None;
        self.status = SessionStatus::Paused;
        tracing::info!(
            "Session {} paused with {}s remaining",
            self.code,
            remaining.as_secs()
        );
        self.broadcast(ServerMessage::SessionPaused);
    }

    fn on_resume(&mut self, host_conn: ConnId) {
        if self.status != SessionStatus::Paused {
            self.queue(
                host_conn,
                ServerMessage::error(
                    ErrorKind::BadMessage,
                    format!("cannot resume from {}", self.status.as_str()),
                ),
            );
            return;
        }
        let remaining = self.remaining_on_pause.take().unwrap_or_default();
        self.timer_end = Some(Instant::now() + remaining);
        self.status = SessionStatus::Active;
        tracing::info!(
            "Session {} resumed with {}s remaining",
            self.code,
            remaining.as_secs()
        );
        self.broadcast(ServerMessage::SessionResumed {
            remaining_seconds: remaining.as_secs(),
        });
    }

    fn on_end_command(&mut self, host_conn: ConnId) {
        if !matches!(self.status, SessionStatus::Active | SessionStatus::Paused) {
            self.queue(
                host_conn,
                ServerMessage::error(
                    ErrorKind::BadMessage,
                    format!("cannot end from {}", self.status.as_str()),
                ),
            );
            return;
        }
        self.end_session("host command");
    }

    fn end_session(&mut self, why: &str) {
        self.status = SessionStatus::Ended;
        self.ended_at = Some(Utc::now());
        self.timer_end = None;
        self.remaining_on_pause = None;

        let final_leaderboard = self.leaderboard();
        let awards = leaderboard::compute_awards(&self.award_candidates());
        let results = SessionResults {
            session: self.session_snapshot(),
            final_leaderboard: final_leaderboard.clone(),
            awards: awards.clone(),
            players: (0..self.players.len())
                .map(|i| self.player_snapshot(i))
                .collect(),
        };
        self.results = Some(results.clone());
        self.reap_at = Some(Instant::now() + self.timings.reap_grace);

        tracing::info!(
            "Session {} ended ({}): {} players, winner {:?}",
            self.code,
            why,
            self.players.len(),
            final_leaderboard.first().map(|r| r.display_name.as_str())
        );
        self.broadcast(ServerMessage::SessionEnded {
            final_leaderboard,
            awards,
        });

        // Persistence happens off the actor task; the session stays
        // available for the results endpoint either way
        if let Some(db) = self.db.clone() {
            let id = self.id.clone();
            let started_at = self.started_at;
            let ended_at = self.ended_at.unwrap_or_else(Utc::now);
            tokio::spawn(async move {
                if let Err(e) =
                    db_sessions::finalize_session(db.pool(), &id, started_at, ended_at).await
                {
                    tracing::error!("Failed to finalize session {}: {:#}", id, e);
                }
                if let Err(e) = db_results::insert_results(db.pool(), &results).await {
                    tracing::error!("Failed to store results for session {}: {:#}", id, e);
                }
            });
        }
    }

    // ---- gameplay ----

    fn on_death(&mut self, idx: usize, run_score: i64, _metadata: Option<serde_json::Value>) {
        if self.status != SessionStatus::Active {
            self.queue_player(
                idx,
                ServerMessage::error(ErrorKind::NotAccepting, "session is not active"),
            );
            return;
        }

        let now = Instant::now();
        let pending_live = self.players[idx].pending.as_ref().is_some_and(|pending| {
            now.duration_since(pending.issued_at) <= self.timings.answer_timeout
        });
        if pending_live {
            self.queue_player(
                idx,
                ServerMessage::error(ErrorKind::PendingQuestion, "question already pending"),
            );
            return;
        }

        let run_score = run_score.max(0);
        {
            let player = &mut self.players[idx];
            // A lapsed question is forfeit; the new death proceeds
            if player.pending.take().is_some() {
                player.score.forfeit_pending();
                tracing::debug!(
                    "Session {}: {} forfeited an expired question",
                    self.code,
                    player.display_name
                );
            }
            player.stats.record_run();
            if player.first_run_score.is_none() {
                player.first_run_score = Some(run_score);
            }
            player.last_run_score = Some(run_score);
            let outcome = player.score.apply_death(run_score);
            if outcome.credit_consumed {
                player.credits_used += 1;
            }
        }

        let question = self.source.next_for(&self.players[idx].served);
        let public = question.public_view();
        {
            let player = &mut self.players[idx];
            player.served.push(question.question_id.clone());
            player.pending = Some(PendingQuestion {
                question,
                issued_at: now,
            });
        }
        self.queue_player(idx, ServerMessage::Question { question: public });
    }

    fn on_answer(&mut self, idx: usize, question_id: String, answer_index: u8, time_ms: u64) {
        if self.status != SessionStatus::Active {
            self.queue_player(
                idx,
                ServerMessage::error(ErrorKind::NotAccepting, "session is not active"),
            );
            return;
        }

        let now = Instant::now();
        enum Check {
            NoPending,
            Stale,
            Graded { correct: bool, correct_index: u8 },
        }
        let check = match self.players[idx].pending.as_ref() {
            None => Check::NoPending,
            Some(pending)
                if pending.question.question_id != question_id
                    || now.duration_since(pending.issued_at) > self.timings.answer_timeout =>
            {
                Check::Stale
            }
            Some(pending) => Check::Graded {
                correct: pending.question.is_correct(answer_index),
                correct_index: pending.question.correct_index,
            },
        };

        match check {
            Check::NoPending => {
                self.queue_player(
                    idx,
                    ServerMessage::error(ErrorKind::Expired, "no question pending"),
                );
            }
            Check::Stale => {
                // Wrong id or past the window; the pending question stands
                // until the next death
                self.queue_player(idx, ServerMessage::error(ErrorKind::Expired, "expired"));
            }
            Check::Graded {
                correct,
                correct_index,
            } => {
                let time = time_ms.min(self.timings.answer_timeout.as_millis() as u64);
                let reply = {
                    let player = &mut self.players[idx];
                    player.pending = None;
                    player.stats.record_answer(correct, time);
                    if correct {
                        let credits_before = player.score.comeback_credits;
                        let out = player.score.apply_correct();
                        if out.comeback_credits > credits_before {
                            player.credits_earned += 1;
                        }
                        ServerMessage::AnswerCorrect {
                            bonus_earned: out.bonus_earned,
                            total_score: out.total_score,
                            current_streak: out.current_streak,
                            streak_multiplier: out.streak_multiplier,
                            comeback_credits: out.comeback_credits,
                            comeback_start_score: out.comeback_start_score,
                            respawn: true,
                        }
                    } else {
                        player.score.apply_wrong();
                        ServerMessage::AnswerWrong {
                            correct_index,
                            respawn: false,
                        }
                    }
                };
                self.queue_player(idx, reply);
                if correct {
                    self.broadcast_leaderboards();
                }
            }
        }
    }

    fn on_score_update(&mut self, idx: usize, score: i64) {
        let player_id = self.players[idx].id.clone();
        self.queue_host(ServerMessage::PlayerScoreUpdate { player_id, score });
    }

    fn on_special_event(&mut self, idx: usize, event: serde_json::Value) {
        let (player_id, display_name) = {
            let player = &self.players[idx];
            (player.id.clone(), player.display_name.clone())
        };
        self.queue_host(ServerMessage::LiveEvent {
            player_id,
            display_name,
            event,
        });
    }

    // ---- REST requests ----

    fn on_join(&mut self, name: String, is_teacher: bool) -> Result<PlayerInfo, JoinError> {
        if is_teacher && self.teacher_mode != TeacherMode::Play {
            return Err(JoinError::NotAccepting);
        }
        if !self.status.accepts_joins() {
            return Err(JoinError::NotAccepting);
        }
        if self.players.len() >= self.config.max_players {
            return Err(JoinError::Full);
        }

        let name =
            normalize_display_name(&name).map_err(|e| JoinError::BadName(e.to_string()))?;
        let taken: Vec<String> = self
            .players
            .iter()
            .map(|p| p.display_name.clone())
            .collect();
        let display_name = dedup_display_name(&name, &taken);

        let player_id = Uuid::new_v4().to_string();
        let token = auth::mint_player_token();
        let joined_at = Utc::now();

        let idx = self.players.len();
        self.players.push(PlayerEntry {
            id: player_id.clone(),
            display_name: display_name.clone(),
            is_teacher,
            conn: None,
            connected: false,
            score: ScoreState::default(),
            stats: PlayerStats::default(),
            served: Vec::new(),
            pending: None,
            first_run_score: None,
            last_run_score: None,
            credits_earned: 0,
            credits_used: 0,
        });
        self.by_token.insert(token.clone(), idx);

        tracing::info!(
            "Session {}: {} joined ({}/{})",
            self.code,
            display_name,
            self.players.len(),
            self.config.max_players
        );
        self.queue_host(ServerMessage::PlayerConnected {
            player_id: player_id.clone(),
            display_name: display_name.clone(),
            player_count: self.players.len(),
        });

        Ok(PlayerInfo {
            id: player_id,
            name: display_name,
            session_code: self.code.clone(),
            player_token: token,
            is_teacher,
            joined_at,
        })
    }

    fn preview(&self) -> SessionPreview {
        SessionPreview {
            code: self.code.clone(),
            status: self.status,
            game_type: self.game_type,
            player_count: self.players.len(),
            max_players: self.config.max_players,
        }
    }

    // ---- timer ----

    fn on_tick(&mut self) {
        let now = Instant::now();

        // Heartbeat: drop connections silent beyond the timeout
        let stale: Vec<ConnId> = self
            .conns
            .iter()
            .filter(|(_, state)| {
                now.duration_since(state.last_seen) > self.timings.heartbeat_timeout
            })
            .map(|(&id, _)| id)
            .collect();
        for conn_id in stale {
            tracing::info!("Session {}: conn {} heartbeat timeout", self.code, conn_id);
            self.drop_conn(conn_id, CloseReason::HeartbeatTimeout);
        }

        // Session timer
        if self.status == SessionStatus::Active {
            if let Some(end) = self.timer_end {
                if now >= end {
                    self.end_session("time expired");
                }
            }
        }

        // Reap after the grace period
        if let Some(reap_at) = self.reap_at {
            if now >= reap_at {
                let open: Vec<ConnId> = self.conns.keys().copied().collect();
                for conn_id in open {
                    self.drop_conn(conn_id, CloseReason::SessionEnded);
                }
                let _ = self.reaper.send(self.code.clone());
                self.stopped = true;
            }
        }
    }

    // ---- snapshots & leaderboards ----

    fn remaining_seconds(&self) -> Option<u64> {
        match self.status {
            SessionStatus::Active => self
                .timer_end
                .map(|end| end.saturating_duration_since(Instant::now()).as_secs()),
            SessionStatus::Paused => self.remaining_on_pause.map(|d| d.as_secs()),
            _ => None,
        }
    }

    fn session_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            code: self.code.clone(),
            status: self.status,
            game_type: self.game_type,
            teacher_mode: self.teacher_mode,
            time_limit_seconds: self.config.time_limit_seconds,
            max_players: self.config.max_players,
            player_count: self.players.len(),
            remaining_seconds: self.remaining_seconds(),
            created_at: self.created_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    fn player_snapshot(&self, idx: usize) -> PlayerSnapshot {
        let player = &self.players[idx];
        PlayerSnapshot {
            player_id: player.id.clone(),
            display_name: player.display_name.clone(),
            is_teacher: player.is_teacher,
            connected: player.connected,
            total_score: player.score.total_score,
            current_streak: player.score.current_streak,
            best_streak: player.score.best_streak,
            streak_multiplier: player.score.multiplier(),
            comeback_credits: player.score.comeback_credits,
            stats: player.stats,
        }
    }

    /// Pending question for a reconnect snapshot, if still answerable
    fn live_pending(&self, idx: usize) -> Option<arcade_core::types::PublicQuestion> {
        let pending = self.players[idx].pending.as_ref()?;
        let age = Instant::now().duration_since(pending.issued_at);
        (age <= self.timings.answer_timeout).then(|| pending.question.public_view())
    }

    fn leaderboard(&self) -> Vec<LeaderboardRow> {
        let standings: Vec<PlayerStanding> = self
            .players
            .iter()
            .enumerate()
            .map(|(join_order, p)| PlayerStanding {
                player_id: p.id.clone(),
                display_name: p.display_name.clone(),
                is_teacher: p.is_teacher,
                join_order,
                total_score: p.score.total_score,
                best_streak: p.score.best_streak,
            })
            .collect();
        leaderboard::rank(&standings)
    }

    fn award_candidates(&self) -> Vec<AwardCandidate> {
        self.players
            .iter()
            .enumerate()
            .map(|(join_order, p)| AwardCandidate {
                player_id: p.id.clone(),
                display_name: p.display_name.clone(),
                join_order,
                total_score: p.score.total_score,
                best_streak: p.score.best_streak,
                first_run_score: p.first_run_score,
                last_run_score: p.last_run_score,
                runs: p.stats.games_played,
                questions_answered: p.stats.questions_answered,
                avg_time_ms: p.stats.avg_time_ms,
                credits_earned: p.credits_earned,
                credits_used: p.credits_used,
            })
            .collect()
    }

    /// Host gets the full board on every score change; each player gets the
    /// top five plus their own rank when that view changes for them.
    fn broadcast_leaderboards(&mut self) {
        let rows = self.leaderboard();
        self.queue_host(ServerMessage::LeaderboardUpdate {
            leaderboard: rows.clone(),
            your_rank: None,
            your_score: None,
        });

        let connected: Vec<usize> = (0..self.players.len())
            .filter(|&i| self.players[i].conn.is_some())
            .collect();
        for idx in connected {
            let own = rows.iter().find(|r| r.player_id == self.players[idx].id);
            let view = ServerMessage::LeaderboardUpdate {
                leaderboard: rows.iter().take(5).cloned().collect(),
                your_rank: own.map(|r| r.rank),
                your_score: own.map(|r| r.total_score),
            };
            let key = serde_json::to_string(&view).unwrap_or_default();
            if self.last_leaderboard_view.get(&idx) != Some(&key) {
                self.last_leaderboard_view.insert(idx, key);
                self.queue_player(idx, view);
            }
        }
    }

    // ---- outbox ----

    fn queue(&mut self, conn_id: ConnId, message: ServerMessage) {
        self.outbox.push((conn_id, message));
    }

    fn queue_host(&mut self, message: ServerMessage) {
        if let Some(host) = self.host {
            self.queue(host, message);
        }
    }

    fn queue_player(&mut self, idx: usize, message: ServerMessage) {
        if let Some(conn_id) = self.players[idx].conn {
            self.queue(conn_id, message);
        }
    }

    fn broadcast(&mut self, message: ServerMessage) {
        let targets: Vec<ConnId> = self.conns.keys().copied().collect();
        for conn_id in targets {
            self.queue(conn_id, message.clone());
        }
    }

    /// Drain the outbox. A full queue is the slow-consumer condition: the
    /// connection is closed and the player marked disconnected, which may
    /// enqueue follow-up notifications, so drain until quiet.
    fn flush(&mut self) {
        for _ in 0..8 {
            if self.outbox.is_empty() {
                return;
            }
            let batch = std::mem::take(&mut self.outbox);
            for (conn_id, message) in batch {
                let Some(state) = self.conns.get(&conn_id) else {
                    continue;
                };
                match state.handle.send(message) {
                    SendOutcome::Sent => {}
                    SendOutcome::Full => {
                        tracing::warn!(
                            "Session {}: conn {} slow consumer, dropping",
                            self.code,
                            conn_id
                        );
                        self.drop_conn(conn_id, CloseReason::SlowConsumer);
                    }
                    SendOutcome::Closed => self.detach(conn_id),
                }
            }
        }
        if !self.outbox.is_empty() {
            tracing::warn!("Session {}: outbox not drained, dropping tail", self.code);
            self.outbox.clear();
        }
    }
}
