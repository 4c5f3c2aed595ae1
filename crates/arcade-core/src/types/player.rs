//! Player types and display-name handling

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::{ProtocolError, Result};
use crate::protocol::constants::NAME_LENGTH;

/// Join response payload returned by the REST surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
    pub session_code: String,
    pub player_token: String,
    pub is_teacher: bool,
    pub joined_at: DateTime<Utc>,
}

/// Aggregate answer/run statistics for one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub questions_answered: u32,
    pub questions_correct: u32,
    pub avg_time_ms: u64,
    pub games_played: u32,
}

impl PlayerStats {
    /// Fold one answered question into the running average
    pub fn record_answer(&mut self, correct: bool, time_ms: u64) {
        let total = self.avg_time_ms as u128 * self.questions_answered as u128 + time_ms as u128;
        self.questions_answered = self.questions_answered.saturating_add(1);
        self.avg_time_ms = (total / self.questions_answered as u128) as u64;
        if correct {
            self.questions_correct = self.questions_correct.saturating_add(1);
        }
    }

    pub fn record_run(&mut self) {
        self.games_played = self.games_played.saturating_add(1);
    }
}

/// Point-in-time view of a player, embedded in snapshots and broadcasts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: String,
    pub display_name: String,
    pub is_teacher: bool,
    pub connected: bool,
    pub total_score: i64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub streak_multiplier: f64,
    pub comeback_credits: u8,
    pub stats: PlayerStats,
}

/// Normalize and validate a requested display name.
///
/// NFC-normalizes, trims surrounding whitespace, then enforces 2–50 code
/// points with no control characters.
pub fn normalize_display_name(raw: &str) -> Result<String> {
    let normalized: String = raw.nfc().collect();
    let trimmed = normalized.trim();
    if trimmed.chars().any(char::is_control) {
        return Err(ProtocolError::InvalidName("control characters not allowed"));
    }
    let len = trimmed.chars().count();
    if len < *NAME_LENGTH.start() {
        return Err(ProtocolError::InvalidName("name too short"));
    }
    if len > *NAME_LENGTH.end() {
        return Err(ProtocolError::InvalidName("name too long"));
    }
    Ok(trimmed.to_string())
}

/// Deduplicate `name` against `taken` case-insensitively by appending `#2`,
/// `#3`, … on collision.
pub fn dedup_display_name(name: &str, taken: &[String]) -> String {
    let clashes = |candidate: &str| {
        taken
            .iter()
            .any(|t| t.to_lowercase() == candidate.to_lowercase())
    };
    if !clashes(name) {
        return name.to_string();
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{}#{}", name, n);
        if !clashes(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_and_validated() {
        assert_eq!(normalize_display_name("  Ada  ").unwrap(), "Ada");
        assert!(normalize_display_name("A").is_err());
        assert!(normalize_display_name("   ").is_err());
        assert!(normalize_display_name("Bad\u{0007}Name").is_err());
        let long = "x".repeat(51);
        assert!(normalize_display_name(&long).is_err());
        assert!(normalize_display_name(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn name_is_nfc_normalized() {
        // e + combining acute composes to é
        let decomposed = "Ae\u{0301}da";
        let normalized = normalize_display_name(decomposed).unwrap();
        assert_eq!(normalized, "A\u{00e9}da");
    }

    #[test]
    fn duplicate_names_get_numeric_suffixes() {
        let taken = vec!["Ada".to_string(), "ada#2".to_string()];
        assert_eq!(dedup_display_name("Ada", &taken), "Ada#3");
        assert_eq!(dedup_display_name("Grace", &taken), "Grace");
        assert_eq!(dedup_display_name("ADA", &taken), "ADA#3");
    }

    #[test]
    fn stats_running_average() {
        let mut stats = PlayerStats::default();
        stats.record_answer(true, 1000);
        stats.record_answer(false, 3000);
        assert_eq!(stats.questions_answered, 2);
        assert_eq!(stats.questions_correct, 1);
        assert_eq!(stats.avg_time_ms, 2000);
    }
}
