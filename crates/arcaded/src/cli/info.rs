//! Server info command

use anyhow::Result;

use crate::config::Config;

pub async fn run(config_path: &str) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("arcaded configuration ({})", config_path);
    println!();
    println!("  Listen:        {}:{}", config.server.address, config.server.port);
    println!("  Max sessions:  {}", config.server.max_sessions);
    println!("  Database:      {}", config.database.path.display());
    println!("  Log level:     {}", config.logging.level);
    println!();
    println!("  Heartbeat:     every {}s, timeout {}s",
        config.session.heartbeat_interval_seconds,
        config.session.heartbeat_timeout_seconds);
    println!("  Answer window: {}s", config.session.answer_timeout_seconds);
    println!("  Reap grace:    {}s", config.session.reap_grace_seconds);

    Ok(())
}
