//! Serve command handler.
//!
//! Builds the RAG system, loads the docs folder, then runs the HTTP API
//! until interrupted.

use crate::server::{router, AppState};
use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult, PreferenceStore};
use ragchat_knowledge::RagSystem;
use std::sync::Arc;

/// Run the HTTP API and serve the frontend
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (default from config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (default from config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Skip loading the docs folder at startup
    #[arg(long)]
    pub no_ingest: bool,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        let rag = Arc::new(RagSystem::from_config(config)?);

        if !self.no_ingest {
            let docs = config.docs_path();
            match rag.add_course_folder(&docs, false).await {
                Ok(stats) => tracing::info!(
                    "Loaded {} courses with {} chunks from {:?}",
                    stats.courses_added,
                    stats.chunks_added,
                    docs
                ),
                Err(e) => tracing::error!("Error loading documents from {:?}: {}", docs, e),
            }
        }

        let preferences = PreferenceStore::open(config.preferences_path())?;
        let state = Arc::new(AppState::new(rag, preferences));
        let app = router(state, &config.frontend_path());

        let host = self.host.as_deref().unwrap_or(&config.server.host);
        let port = self.port.unwrap_or(config.server.port);
        let addr = format!("{}:{}", host, port);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", addr, e)))?;
        tracing::info!("Listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
