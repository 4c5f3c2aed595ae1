//! Configuration management

use arcade_core::protocol::constants;
use arcade_core::question::MathConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub questions: QuestionConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub reap_grace_seconds: u64,
    pub heartbeat_interval_seconds: u64,
    pub heartbeat_timeout_seconds: u64,
    pub answer_timeout_seconds: u64,
    pub init_deadline_seconds: u64,
    pub outbound_queue_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionConfig {
    /// Defaults applied when a session enables the math source without
    /// its own config
    pub math: MathConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key shared with the identity provider that signs teacher tokens
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                address: "0.0.0.0".to_string(),
                port: 8090,
                max_sessions: 200,
            },
            session: SessionConfig {
                reap_grace_seconds: constants::REAP_GRACE_SECONDS,
                heartbeat_interval_seconds: constants::HEARTBEAT_INTERVAL_SECONDS,
                heartbeat_timeout_seconds: constants::HEARTBEAT_TIMEOUT_SECONDS,
                answer_timeout_seconds: constants::ANSWER_TIMEOUT_SECONDS,
                init_deadline_seconds: constants::INIT_DEADLINE_SECONDS,
                outbound_queue_size: constants::OUTBOUND_QUEUE_SIZE,
            },
            questions: QuestionConfig {
                math: MathConfig::default(),
            },
            auth: AuthConfig {
                jwt_secret: "change-me".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("./arcaded.db"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved durations for session actors and connections
    pub fn timings(&self) -> SessionTimings {
        SessionTimings {
            reap_grace: Duration::from_secs(self.session.reap_grace_seconds),
            heartbeat_interval: Duration::from_secs(self.session.heartbeat_interval_seconds),
            heartbeat_timeout: Duration::from_secs(self.session.heartbeat_timeout_seconds),
            answer_timeout: Duration::from_secs(self.session.answer_timeout_seconds),
            init_deadline: Duration::from_secs(self.session.init_deadline_seconds),
            outbound_queue_size: self.session.outbound_queue_size,
        }
    }
}

/// Session/connection timing knobs as durations
#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    pub reap_grace: Duration,
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub answer_timeout: Duration,
    pub init_deadline: Duration,
    pub outbound_queue_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.server.port, config.server.port);
        assert_eq!(
            back.session.answer_timeout_seconds,
            config.session.answer_timeout_seconds
        );
    }
}
