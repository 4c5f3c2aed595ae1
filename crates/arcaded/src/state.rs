//! Process-wide state: the session registry

use anyhow::{Context, Result};
use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use arcade_core::protocol::constants::{SESSION_CODE_ALPHABET, SESSION_CODE_LENGTH};
use arcade_core::question::{BankSampler, MathConfig, MathGenerator, QuestionSource};
use arcade_core::types::{GameType, QuestionSourceKind, SessionConfig, TeacherMode};

use crate::auth::TeacherAuth;
use crate::config::{Config, SessionTimings};
use crate::db::{banks, sessions as db_sessions, Database};
use crate::session::{self, actor::SessionParams, SessionHandle};

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("session limit reached")]
    Capacity,

    #[error("{0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Map of live sessions by code. Create/lookup here; entries are removed by
/// the owning actor after the post-end grace period.
pub struct Registry {
    sessions: DashMap<String, SessionHandle>,
    max_sessions: usize,
    reap_tx: mpsc::UnboundedSender<String>,
}

impl Registry {
    pub fn new(max_sessions: usize) -> Arc<Self> {
        let (reap_tx, mut reap_rx) = mpsc::unbounded_channel::<String>();
        let registry = Arc::new(Self {
            sessions: DashMap::new(),
            max_sessions,
            reap_tx,
        });

        let for_reaper = Arc::downgrade(&registry);
        tokio::spawn(async move {
            while let Some(code) = reap_rx.recv().await {
                let Some(registry) = for_reaper.upgrade() else {
                    break;
                };
                registry.sessions.remove(&code);
                tracing::info!("Session {} reaped", code);
            }
        });

        registry
    }

    /// Create a session: generate a code, build the question source, spawn
    /// the actor, and record the session row.
    pub async fn create(
        &self,
        db: &Database,
        timings: SessionTimings,
        teacher_id: String,
        teacher_mode: TeacherMode,
        game_type: GameType,
        config: SessionConfig,
        math_defaults: &MathConfig,
    ) -> std::result::Result<SessionHandle, CreateError> {
        if self.sessions.len() >= self.max_sessions {
            return Err(CreateError::Capacity);
        }
        config
            .validate()
            .map_err(|e| CreateError::InvalidConfig(e.to_string()))?;

        let source = self
            .build_source(db, &config, math_defaults)
            .await
            .map_err(|e| CreateError::InvalidConfig(e.to_string()))?;

        let code = self.generate_code()?;
        let id = Uuid::new_v4().to_string();

        db_sessions::insert_session(
            db.pool(),
            &id,
            &code,
            &teacher_id,
            game_type.as_str(),
            Utc::now(),
        )
        .await
        .context("Failed to record session")?;

        let handle = session::spawn(SessionParams {
            id,
            code: code.clone(),
            teacher_id,
            teacher_mode,
            game_type,
            config,
            source,
            timings,
            db: Some(db.clone()),
            reaper: self.reap_tx.clone(),
        });
        self.sessions.insert(code.clone(), handle.clone());
        tracing::info!(
            "Session {} created ({} live)",
            code,
            self.sessions.len()
        );
        Ok(handle)
    }

    async fn build_source(
        &self,
        db: &Database,
        config: &SessionConfig,
        math_defaults: &MathConfig,
    ) -> Result<QuestionSource> {
        match config.question_source {
            QuestionSourceKind::Math => {
                let math = config
                    .math_config
                    .clone()
                    .unwrap_or_else(|| math_defaults.clone());
                Ok(QuestionSource::Math(MathGenerator::new(math)?))
            }
            QuestionSourceKind::Bank => {
                let ids = config.bank_ids.clone().unwrap_or_default();
                let questions = banks::load_questions(db.pool(), &ids).await?;
                Ok(QuestionSource::Bank(BankSampler::new(questions)?))
            }
        }
    }

    /// Generate a code unique among live sessions
    fn generate_code(&self) -> std::result::Result<String, CreateError> {
        let mut rng = rand::rng();
        for _ in 0..64 {
            let code: String = (0..SESSION_CODE_LENGTH)
                .map(|_| {
                    SESSION_CODE_ALPHABET[rng.random_range(0..SESSION_CODE_ALPHABET.len())] as char
                })
                .collect();
            if !self.sessions.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(CreateError::Internal(anyhow::anyhow!(
            "could not generate a unique session code"
        )))
    }

    /// Look up a live session by code (case-insensitive)
    pub fn lookup(&self, code: &str) -> Option<SessionHandle> {
        self.sessions
            .get(&code.to_uppercase())
            .map(|entry| entry.clone())
    }

    /// Look up a live session by opaque id
    pub fn lookup_by_id(&self, id: &str) -> Option<SessionHandle> {
        self.sessions
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Shared state behind the HTTP surface
pub struct AppState {
    pub config: Config,
    pub timings: SessionTimings,
    pub registry: Arc<Registry>,
    pub db: Database,
    pub auth: TeacherAuth,
    next_conn_id: AtomicU64,
}

impl AppState {
    pub fn new(config: Config, registry: Arc<Registry>, db: Database) -> Self {
        let auth = TeacherAuth::new(&config.auth.jwt_secret);
        let timings = config.timings();
        Self {
            config,
            timings,
            registry,
            db,
            auth,
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Allocate a connection id, unique for the process lifetime
    pub fn allocate_conn_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }
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

    async fn test_db() -> Database {
        let db = Database::in_memory().await.unwrap();
        db.init_schema().await.unwrap();
        db
    }

    #[tokio::test]
    async fn create_and_lookup() {
        let registry = Registry::new(10);
        let db = test_db().await;
        let handle = registry
            .create(
                &db,
                Config::default().timings(),
                "t1".into(),
                TeacherMode::Monitor,
                GameType::SnakeRace,
                config(),
                &MathConfig::default(),
            )
            .await
            .unwrap();

        assert_eq!(handle.code.len(), SESSION_CODE_LENGTH);
        assert!(registry.lookup(&handle.code).is_some());
        assert!(registry.lookup(&handle.code.to_lowercase()).is_some());
        assert!(registry.lookup_by_id(&handle.id).is_some());
        assert!(registry.lookup("ZZZZZZ").is_none());
        assert_eq!(registry.session_count(), 1);
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let registry = Registry::new(1);
        let db = test_db().await;
        let timings = Config::default().timings();
        registry
            .create(
                &db,
                timings,
                "t1".into(),
                TeacherMode::Monitor,
                GameType::SnakeRace,
                config(),
                &MathConfig::default(),
            )
            .await
            .unwrap();
        let err = registry
            .create(
                &db,
                timings,
                "t1".into(),
                TeacherMode::Monitor,
                GameType::SnakeRace,
                config(),
                &MathConfig::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::Capacity));
    }

    #[tokio::test]
    async fn bank_source_requires_questions() {
        let registry = Registry::new(10);
        let db = test_db().await;
        let mut cfg = config();
        cfg.question_source = QuestionSourceKind::Bank;
        cfg.bank_ids = Some(vec![999]);
        let err = registry
            .create(
                &db,
                Config::default().timings(),
                "t1".into(),
                TeacherMode::Monitor,
                GameType::SnakeRace,
                cfg,
                &MathConfig::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::InvalidConfig(_)));
    }
}
