//! Server implementation

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::Config;
use crate::db::Database;
use crate::handlers;
use crate::state::{AppState, Registry};

pub struct Server {
    state: Arc<AppState>,
    shutdown: Arc<Notify>,
}

impl Server {
    /// Create a new server instance: open the store, initialize the schema,
    /// and build the registry.
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::new(&config.database.path)
            .await
            .context("Failed to open database")?;
        db.init_schema().await?;

        let registry = Registry::new(config.server.max_sessions);
        let state = Arc::new(AppState::new(config, registry, db));

        Ok(Self {
            state,
            shutdown: Arc::new(Notify::new()),
        })
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the server main loop
    pub async fn run(self) -> Result<()> {
        let addr = format!(
            "{}:{}",
            self.state.config.server.address, self.state.config.server.port
        );

        let listener = TcpListener::bind(&addr)
            .await
            .context(format!("Failed to bind to {}", addr))?;

        tracing::info!(
            "arcaded listening on {} (max {} sessions)",
            addr,
            self.state.config.server.max_sessions
        );

        // Graceful shutdown on ctrl-c
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            } else {
                tracing::info!("Received shutdown signal");
            }
            shutdown.notify_waiters();
        });

        let app = handlers::router(self.state.clone());
        let shutdown = self.shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await
            .context("Server error")?;

        tracing::info!(
            "Server shutdown complete ({} live sessions dropped)",
            self.state.registry.session_count()
        );
        Ok(())
    }
}
