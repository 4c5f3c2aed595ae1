//! Math question generator

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::error::{ProtocolError, Result};
use crate::types::Question;

/// Arithmetic operations the generator can draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl MathOp {
    pub fn symbol(self) -> char {
        match self {
            MathOp::Add => '+',
            MathOp::Sub => '-',
            MathOp::Mul => '×',
            MathOp::Div => '÷',
        }
    }
}

/// Generator configuration: enabled operations and the operand range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathConfig {
    pub operations: Vec<MathOp>,
    pub min_operand: i64,
    pub max_operand: i64,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            operations: vec![MathOp::Add, MathOp::Sub, MathOp::Mul],
            min_operand: 1,
            max_operand: 12,
        }
    }
}

impl MathConfig {
    pub fn validate(&self) -> Result<()> {
        if self.operations.is_empty() {
            return Err(ProtocolError::InvalidConfig(
                "math config needs at least one operation".into(),
            ));
        }
        if self.min_operand < 0 {
            return Err(ProtocolError::InvalidConfig(
                "min_operand must be nonnegative".into(),
            ));
        }
        if self.max_operand < self.min_operand || self.max_operand < 1 {
            return Err(ProtocolError::InvalidConfig(format!(
                "invalid operand range {}..={}",
                self.min_operand, self.max_operand
            )));
        }
        Ok(())
    }
}

/// Attempts at an unseen problem before a repeat is allowed
const MAX_FRESH_ATTEMPTS: usize = 64;

/// Generates arithmetic questions with stable ids.
///
/// The question id is a hash of `(a, op, b)`, so re-requesting the question
/// for a retried death yields the same id, and the no-repeat check works
/// across generator calls.
pub struct MathGenerator {
    config: MathConfig,
    rng: StdRng,
}

impl MathGenerator {
    pub fn new(config: MathConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Deterministic generator for tests
    pub fn with_seed(config: MathConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Produce the next question, avoiding ids in `seen` while possible
    pub fn next_for(&mut self, seen: &[String]) -> Question {
        let seen: HashSet<&str> = seen.iter().map(String::as_str).collect();
        let mut problem = self.generate();
        for _ in 0..MAX_FRESH_ATTEMPTS {
            if !seen.contains(question_id(problem.0, problem.1, problem.2).as_str()) {
                break;
            }
            problem = self.generate();
        }
        let (a, op, b, answer) = problem;
        self.build_question(a, op, b, answer)
    }

    /// Sample an operation and operands per the configured policy
    fn generate(&mut self) -> (i64, MathOp, i64, i64) {
        let op = self.config.operations[self.rng.random_range(0..self.config.operations.len())];
        let min = self.config.min_operand;
        let max = self.config.max_operand;
        match op {
            MathOp::Add => {
                let a = self.rng.random_range(min..=max);
                let b = self.rng.random_range(min..=max);
                (a, op, b, a + b)
            }
            MathOp::Sub => {
                let x = self.rng.random_range(min..=max);
                let y = self.rng.random_range(min..=max);
                // Arrange a >= b so the result is nonnegative
                let (a, b) = if x >= y { (x, y) } else { (y, x) };
                (a, op, b, a - b)
            }
            MathOp::Mul => {
                let a = self.rng.random_range(min..=max);
                let b = self.rng.random_range(min..=max);
                (a, op, b, a * b)
            }
            MathOp::Div => {
                // Build the dividend from divisor × quotient so the result
                // is always an integer within range
                let b = self.rng.random_range(min.max(1)..=max);
                let q_max = (max / b).max(1);
                let q = self.rng.random_range(1..=q_max);
                (b * q, op, b, q)
            }
        }
    }

    /// Options: the answer plus three distractors drawn from small
    /// perturbations and the operand swap, deduplicated and shuffled.
    fn build_question(&mut self, a: i64, op: MathOp, b: i64, answer: i64) -> Question {
        let mut candidates = vec![answer - 1, answer + 1, answer - 2, answer + 2];
        match op {
            MathOp::Sub => candidates.push(b - a),
            MathOp::Div if a != 0 && b % a == 0 => candidates.push(b / a),
            _ => {}
        }

        let mut seen = HashSet::new();
        candidates.retain(|&c| c != answer && seen.insert(c));
        candidates.shuffle(&mut self.rng);
        candidates.truncate(3);

        let mut options: Vec<i64> = candidates;
        options.push(answer);
        options.shuffle(&mut self.rng);
        let correct_index = options.iter().position(|&o| o == answer).unwrap_or(0) as u8;

        let options: [String; 4] = [
            options[0].to_string(),
            options[1].to_string(),
            options[2].to_string(),
            options[3].to_string(),
        ];

        Question {
            question_id: question_id(a, op, b),
            text: format!("{} {} {}", a, op.symbol(), b),
            options,
            correct_index,
            category: Some("math".to_string()),
            difficulty: None,
        }
    }
}

/// Stable id for a problem: truncated SHA-256 of `(a, op, b)`
pub fn question_id(a: i64, op: MathOp, b: i64) -> String {
    let digest = Sha256::digest(format!("{} {} {}", a, op.symbol(), b).as_bytes());
    format!("m{}", &hex::encode(digest)[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(ops: Vec<MathOp>) -> MathGenerator {
        MathGenerator::with_seed(
            MathConfig {
                operations: ops,
                min_operand: 1,
                max_operand: 12,
            },
            42,
        )
        .unwrap()
    }

    fn parse_problem(text: &str) -> (i64, char, i64) {
        let mut parts = text.split_whitespace();
        let a = parts.next().unwrap().parse().unwrap();
        let op = parts.next().unwrap().chars().next().unwrap();
        let b = parts.next().unwrap().parse().unwrap();
        (a, op, b)
    }

    #[test]
    fn questions_have_four_options_with_the_answer_present() {
        let mut generator = generator(vec![MathOp::Add, MathOp::Sub, MathOp::Mul, MathOp::Div]);
        for _ in 0..200 {
            let q = generator.next_for(&[]);
            assert_eq!(q.options.len(), 4);
            assert!(q.correct_index < 4);
            // All options distinct
            let set: HashSet<&String> = q.options.iter().collect();
            assert_eq!(set.len(), 4, "duplicate options in {:?}", q.options);

            let (a, op, b) = parse_problem(&q.text);
            let expected = match op {
                '+' => a + b,
                '-' => a - b,
                '×' => a * b,
                '÷' => a / b,
                _ => panic!("unexpected op {}", op),
            };
            assert_eq!(
                q.options[q.correct_index as usize],
                expected.to_string(),
                "wrong answer key for {}",
                q.text
            );
        }
    }

    #[test]
    fn subtraction_never_goes_negative() {
        let mut generator = generator(vec![MathOp::Sub]);
        for _ in 0..100 {
            let q = generator.next_for(&[]);
            let (a, _, b) = parse_problem(&q.text);
            assert!(a >= b, "subtraction {} arranged badly", q.text);
        }
    }

    #[test]
    fn division_is_always_exact() {
        let mut generator = generator(vec![MathOp::Div]);
        for _ in 0..100 {
            let q = generator.next_for(&[]);
            let (a, _, b) = parse_problem(&q.text);
            assert!(b != 0);
            assert_eq!(a % b, 0, "inexact division {}", q.text);
            assert!(a <= 12, "dividend {} out of range", a);
        }
    }

    #[test]
    fn avoids_repeating_seen_questions() {
        let mut generator = generator(vec![MathOp::Add]);
        let mut seen: Vec<String> = Vec::new();
        // 1..=12 add problems admit far more than 20 distinct ids
        for _ in 0..20 {
            let q = generator.next_for(&seen);
            assert!(!seen.contains(&q.question_id), "repeat of {}", q.text);
            seen.push(q.question_id);
        }
    }

    #[test]
    fn ids_are_stable_for_the_same_problem() {
        assert_eq!(
            question_id(3, MathOp::Add, 4),
            question_id(3, MathOp::Add, 4)
        );
        assert_ne!(
            question_id(3, MathOp::Add, 4),
            question_id(4, MathOp::Add, 3)
        );
    }

    #[test]
    fn config_validation() {
        assert!(MathConfig::default().validate().is_ok());
        let bad = MathConfig {
            operations: vec![],
            ..MathConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = MathConfig {
            min_operand: 10,
            max_operand: 2,
            ..MathConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
