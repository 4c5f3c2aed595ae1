//! Question bank operations

use anyhow::{bail, Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use arcade_core::types::Question;

/// Bank summary row
#[derive(Debug, Clone)]
pub struct Bank {
    pub id: i64,
    pub name: String,
    pub question_count: i64,
}

/// Create a bank and insert its questions. Used by the CLI importer.
pub async fn create_bank(pool: &SqlitePool, name: &str, questions: &[Question]) -> Result<i64> {
    if questions.is_empty() {
        bail!("Bank must contain at least one question");
    }
    for q in questions {
        if q.correct_index > 3 {
            bail!("Question '{}' has correct_index out of range", q.question_id);
        }
    }

    let mut tx = pool.begin().await?;
    let now = Utc::now().timestamp();

    let result = sqlx::query("INSERT INTO question_banks (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create bank (name taken?)")?;
    let bank_id = result.last_insert_rowid();

    for q in questions {
        let options = serde_json::to_string(&q.options)?;
        sqlx::query(
            "INSERT INTO bank_questions
                (bank_id, question_id, text, options, correct_index, category, difficulty)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(bank_id)
        .bind(&q.question_id)
        .bind(&q.text)
        .bind(options)
        .bind(q.correct_index as i64)
        .bind(&q.category)
        .bind(&q.difficulty)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(bank_id)
}

/// List all banks with question counts
pub async fn list_banks(pool: &SqlitePool) -> Result<Vec<Bank>> {
    let rows: Vec<(i64, String, i64)> = sqlx::query_as(
        "SELECT b.id, b.name, COUNT(q.id)
         FROM question_banks b
         LEFT JOIN bank_questions q ON q.bank_id = b.id
         GROUP BY b.id
         ORDER BY b.id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, question_count)| Bank {
            id,
            name,
            question_count,
        })
        .collect())
}

/// Load every question of the given banks, for session creation
pub async fn load_questions(pool: &SqlitePool, bank_ids: &[i64]) -> Result<Vec<Question>> {
    let mut questions = Vec::new();
    for &bank_id in bank_ids {
        let rows: Vec<(String, String, String, i64, Option<String>, Option<String>)> =
            sqlx::query_as(
                "SELECT question_id, text, options, correct_index, category, difficulty
                 FROM bank_questions WHERE bank_id = ? ORDER BY id",
            )
            .bind(bank_id)
            .fetch_all(pool)
            .await?;

        for (question_id, text, options, correct_index, category, difficulty) in rows {
            let options: [String; 4] = serde_json::from_str(&options)
                .with_context(|| format!("Corrupt options for question {}", question_id))?;
            questions.push(Question {
                question_id,
                text,
                options,
                correct_index: correct_index as u8,
                category,
                difficulty,
            });
        }
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn question(id: &str) -> Question {
        Question {
            question_id: id.to_string(),
            text: format!("what is {}?", id),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 1,
            category: Some("history".into()),
            difficulty: None,
        }
    }

    #[tokio::test]
    async fn create_and_load_round_trip() {
        let db = Database::in_memory().await.unwrap();
        db.init_schema().await.unwrap();

        let bank_id = create_bank(db.pool(), "unit-1", &[question("q1"), question("q2")])
            .await
            .unwrap();

        let banks = list_banks(db.pool()).await.unwrap();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].question_count, 2);

        let loaded = load_questions(db.pool(), &[bank_id]).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].question_id, "q1");
        assert_eq!(loaded[0].correct_index, 1);
    }

    #[tokio::test]
    async fn empty_banks_are_rejected() {
        let db = Database::in_memory().await.unwrap();
        db.init_schema().await.unwrap();
        assert!(create_bank(db.pool(), "empty", &[]).await.is_err());
    }
}
