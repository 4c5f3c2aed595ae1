//! Scoring engine
//!
//! Pure transitions over one player's score state. The session actor owns
//! the state and calls these on accepted events; nothing here does I/O or
//! knows about connections.
//!
//! Run scores are only credited to `total_score` when the gating question is
//! answered correctly. The multiplier is kept as an integer percentage so
//! all score arithmetic stays exact.

use serde::{Deserialize, Serialize};

use crate::protocol::constants::MAX_COMEBACK_CREDITS;

/// Multiplier as an integer percent: 100, 125, 150, 175, 200.
///
/// One +25% step per three consecutive correct answers, capped at 2x.
pub fn multiplier_percent(streak: u32) -> i64 {
    100 + 25 * (streak / 3).min(4) as i64
}

/// Multiplier as the wire-format fraction
pub fn streak_multiplier(streak: u32) -> f64 {
    multiplier_percent(streak) as f64 / 100.0
}

/// One player's authoritative score state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub total_score: i64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub comeback_credits: u8,
    /// Effective score of the most recent death, pending crediting
    pub last_death_score: i64,
    /// Head-start score granted if a comeback credit was consumed
    pub comeback_start_score: i64,
    /// True while a question is issued and unanswered
    pub pending_question: bool,
}

/// Result of applying a death
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeathOutcome {
    pub effective_score: i64,
    pub comeback_start_score: i64,
    pub credit_consumed: bool,
}

/// Result of applying a correct answer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectOutcome {
    pub bonus_earned: i64,
    pub total_score: i64,
    pub current_streak: u32,
    pub streak_multiplier: f64,
    pub comeback_credits: u8,
    pub comeback_start_score: i64,
}

impl ScoreState {
    /// Current multiplier derived from the streak
    pub fn multiplier(&self) -> f64 {
        streak_multiplier(self.current_streak)
    }

    /// Apply a death with the given run score.
    ///
    /// The effective score is banked in `last_death_score` but NOT credited;
    /// a comeback credit, if held, is consumed for a half-score head start.
    /// Marks a question pending. The caller must enforce the pending gate
    /// before calling.
    pub fn apply_death(&mut self, run_score: i64) -> DeathOutcome {
        let run_score = run_score.max(0);
        let effective = run_score * multiplier_percent(self.current_streak) / 100;
        self.last_death_score = effective;

        let credit_consumed = self.comeback_credits > 0;
        self.comeback_start_score = if credit_consumed {
            self.comeback_credits -= 1;
            effective / 2
        } else {
            0
        };
        self.pending_question = true;

        DeathOutcome {
            effective_score: effective,
            comeback_start_score: self.comeback_start_score,
            credit_consumed,
        }
    }

    /// Apply a correct answer: the banked run score is credited, the streak
    /// grows, and a comeback credit is earned.
    pub fn apply_correct(&mut self) -> CorrectOutcome {
        self.current_streak = self.current_streak.saturating_add(1);
        self.best_streak = self.best_streak.max(self.current_streak);
        self.comeback_credits = (self.comeback_credits + 1).min(MAX_COMEBACK_CREDITS);

        let bonus_earned = self.last_death_score;
        self.total_score = self.total_score.saturating_add(bonus_earned);
        self.last_death_score = 0;
        self.pending_question = false;

        CorrectOutcome {
            bonus_earned,
            total_score: self.total_score,
            current_streak: self.current_streak,
            streak_multiplier: self.multiplier(),
            comeback_credits: self.comeback_credits,
            comeback_start_score: self.comeback_start_score,
        }
    }

    /// Apply a wrong answer: the banked run score is forfeited and the
    /// streak resets. The player earns a new question on their next death.
    pub fn apply_wrong(&mut self) {
        self.current_streak = 0;
        self.last_death_score = 0;
        self.comeback_start_score = 0;
        self.pending_question = false;
    }

    /// Forfeit an expired pending question without an answer. The streak is
    /// untouched; only the banked run score is lost.
    pub fn forfeit_pending(&mut self) {
        self.last_death_score = 0;
        self.comeback_start_score = 0;
        self.pending_question = false;
    }
}
