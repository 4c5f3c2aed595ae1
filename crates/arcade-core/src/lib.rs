//! # arcade-core
//!
//! Core library for the Review Arcade session server.
//!
//! Everything here is pure and I/O-free: the daemon crate (`arcaded`) owns
//! sockets, actors, and persistence, and drives these building blocks:
//!
//! - Wire protocol types and constants (tagged client/server messages)
//! - Codec (decode/validate inbound frames, encode outbound)
//! - Scoring engine (death / correct / wrong transitions, streak multiplier,
//!   comeback credits)
//! - Question sources (math generator, bank sampler) with no-repeat serving
//! - Leaderboard ranking and the end-of-session award catalogue
//!
//! ## Example
//!
//! ```rust
//! use arcade_core::scoring::ScoreState;
//!
//! let mut state = ScoreState::default();
//! state.apply_death(100);
//! let outcome = state.apply_correct();
//! assert_eq!(outcome.total_score, 100);
//! ```

pub mod codec;
pub mod error;
pub mod leaderboard;
pub mod protocol;
pub mod question;
pub mod scoring;
pub mod types;

// Re-export commonly used types
pub use error::{ProtocolError, Result};
pub use protocol::{ClientMessage, CloseReason, ErrorKind, ServerMessage, WsRole};
pub use types::{Question, SessionConfig, SessionStatus};
