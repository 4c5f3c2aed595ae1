//! Review Arcade Session Daemon (arcaded)

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod auth;
mod cli;
mod config;
mod connection;
mod db;
mod handlers;
mod server;
mod session;
mod state;

pub use config::Config;
pub use server::Server;

#[derive(Parser)]
#[command(name = "arcaded")]
#[command(about = "Review Arcade Session Daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "arcaded.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new server (first-time setup)
    Init,

    /// Run the session daemon
    Serve,

    /// Question bank management
    Bank {
        #[command(subcommand)]
        command: cli::bank::BankCommands,
    },

    /// Show configuration summary
    Info,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the configured level, or info before init
    let level = Config::load(&cli.config)
        .map(|c| c.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => cli::init::run(&cli.config).await,
        Commands::Serve => cli::serve::run(&cli.config).await,
        Commands::Bank { command } => cli::bank::run(&cli.config, command).await,
        Commands::Info => cli::info::run(&cli.config).await,
        Commands::Version => {
            println!("arcaded version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
