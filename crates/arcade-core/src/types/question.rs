//! Question types

use serde::{Deserialize, Serialize};

/// A review question with its answer key.
///
/// The full struct never leaves the server; clients are sent a
/// [`PublicQuestion`] until they have answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question_id: String,
    pub text: String,
    pub options: [String; 4],
    pub correct_index: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl Question {
    /// View safe to transmit to a player who has not yet answered
    pub fn public_view(&self) -> PublicQuestion {
        PublicQuestion {
            question_id: self.question_id.clone(),
            text: self.text.clone(),
            options: self.options.clone(),
            category: self.category.clone(),
            difficulty: self.difficulty.clone(),
        }
    }

    /// Whether `answer_index` selects the correct option
    pub fn is_correct(&self, answer_index: u8) -> bool {
        answer_index == self.correct_index
    }
}

/// Question as seen by a player: no correct index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub question_id: String,
    pub text: String,
    pub options: [String; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_view_hides_the_answer_key() {
        let q = Question {
            question_id: "q1".into(),
            text: "3 + 4".into(),
            options: ["7".into(), "6".into(), "8".into(), "5".into()],
            correct_index: 0,
            category: None,
            difficulty: None,
        };
        let json = serde_json::to_value(q.public_view()).unwrap();
        assert!(json.get("correct_index").is_none());
        assert_eq!(json["question_id"], "q1");
    }
}
