//! Server initialization command

use anyhow::Result;
use std::path::Path;

use arcade_core::types::Question;

use crate::config::Config;
use crate::db::{banks, Database};

pub async fn run(config_path: &str) -> Result<()> {
    println!("Initializing arcaded...\n");

    if Path::new(config_path).exists() {
        println!("Error: Configuration file already exists: {}", config_path);
        println!("Remove it first or use a different path.");
        return Ok(());
    }

    let config = Config::default();
    config.save(config_path)?;
    println!("✓ Configuration created: {}", config_path);

    let db = Database::new(&config.database.path).await?;
    db.init_schema().await?;
    println!("✓ Database initialized: {}", config.database.path.display());

    // A small starter bank so bank-sourced sessions work out of the box
    let bank_id = banks::create_bank(db.pool(), "starter", &starter_questions()).await?;
    println!("✓ Starter question bank created (id {})\n", bank_id);

    println!("Set auth.jwt_secret in {} to the identity provider's", config_path);
    println!("signing key before serving real sessions.");
    println!();
    println!("To start the server:");
    println!("  arcaded serve");

    Ok(())
}

fn starter_questions() -> Vec<Question> {
    let q = |id: &str, text: &str, options: [&str; 4], correct: u8| Question {
        question_id: id.to_string(),
        text: text.to_string(),
        options: options.map(str::to_string),
        correct_index: correct,
        category: Some("general".to_string()),
        difficulty: Some("easy".to_string()),
    };
    vec![
        q(
            "starter-1",
            "Which planet is closest to the sun?",
            ["Venus", "Mercury", "Mars", "Earth"],
            1,
        ),
        q(
            "starter-2",
            "What is 7 × 8?",
            ["54", "58", "56", "64"],
            2,
        ),
        q(
            "starter-3",
            "Which word is a noun?",
            ["Quickly", "Jump", "Bridge", "Blue"],
            2,
        ),
        q(
            "starter-4",
            "Water freezes at what temperature in Celsius?",
            ["0°", "32°", "100°", "-10°"],
            0,
        ),
        q(
            "starter-5",
            "Which of these is a mammal?",
            ["Shark", "Dolphin", "Trout", "Octopus"],
            1,
        ),
    ]
}
