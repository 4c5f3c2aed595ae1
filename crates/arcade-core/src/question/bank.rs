//! Question bank sampler

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use crate::error::{ProtocolError, Result};
use crate::types::Question;

/// Samples from a fixed question list loaded at session creation.
///
/// Unseen questions are drawn uniformly. Once a player has seen the whole
/// bank, repeats are allowed, least recently served first.
pub struct BankSampler {
    questions: Vec<Question>,
    rng: StdRng,
}

impl BankSampler {
    pub fn new(questions: Vec<Question>) -> Result<Self> {
        if questions.is_empty() {
            return Err(ProtocolError::EmptyBank);
        }
        Ok(Self {
            questions,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Deterministic sampler for tests
    pub fn with_seed(questions: Vec<Question>, seed: u64) -> Result<Self> {
        if questions.is_empty() {
            return Err(ProtocolError::EmptyBank);
        }
        Ok(Self {
            questions,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Next question for a player whose serving history is `seen`
    /// (oldest first).
    pub fn next_for(&mut self, seen: &[String]) -> Question {
        let seen_set: HashSet<&str> = seen.iter().map(String::as_str).collect();
        let unseen: Vec<usize> = (0..self.questions.len())
            .filter(|&i| !seen_set.contains(self.questions[i].question_id.as_str()))
            .collect();

        let idx = if !unseen.is_empty() {
            unseen[self.rng.random_range(0..unseen.len())]
        } else {
            // Everything served at least once: prefer the question whose
            // most recent serving is oldest
            (0..self.questions.len())
                .min_by_key(|&i| {
                    seen.iter()
                        .rposition(|id| id == &self.questions[i].question_id)
                })
                .unwrap_or(0)
        };
        self.questions[idx].clone()
    }
}
