//! Server serve command

use anyhow::Result;

use crate::config::Config;
use crate::server::Server;

pub async fn run(config_path: &str) -> Result<()> {
    let config = Config::load(config_path)?;

    tracing::info!("Starting arcaded");
    tracing::info!(
        "Listening on: {}:{}",
        config.server.address,
        config.server.port
    );

    let server = Server::new(config).await?;
    server.run().await
}
