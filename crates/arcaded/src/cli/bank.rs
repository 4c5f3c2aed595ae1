//! Question bank management commands

use anyhow::{Context, Result};
use clap::Subcommand;

use arcade_core::types::Question;

use crate::config::Config;
use crate::db::{banks, Database};

#[derive(Subcommand)]
pub enum BankCommands {
    /// Import a question bank from a JSON file
    Import {
        /// Path to a JSON array of questions
        file: String,

        /// Bank name
        #[arg(long)]
        name: String,
    },

    /// List question banks
    List,
}

pub async fn run(config_path: &str, command: BankCommands) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::new(&config.database.path).await?;
    db.init_schema().await?;

    match command {
        BankCommands::Import { file, name } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file))?;
            let questions: Vec<Question> =
                serde_json::from_str(&content).context("Invalid question JSON")?;
            let bank_id = banks::create_bank(db.pool(), &name, &questions).await?;
            println!(
                "Imported {} questions into bank '{}' (id {})",
                questions.len(),
                name,
                bank_id
            );
        }
        BankCommands::List => {
            let all = banks::list_banks(db.pool()).await?;
            if all.is_empty() {
                println!("No question banks.");
            }
            for bank in all {
                println!("{:>4}  {} ({} questions)", bank.id, bank.name, bank.question_count);
            }
        }
    }

    Ok(())
}
