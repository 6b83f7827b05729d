//! Ask command handler.
//!
//! Runs one query through the same pipeline the HTTP API uses and prints
//! the answer followed by its sources.

use crate::commands::print_json;
use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_knowledge::RagSystem;

/// Ask a single question from the terminal
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Session id to record the exchange under
    #[arg(short, long)]
    pub session: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        if self.query.trim().is_empty() {
            return Err(AppError::Config("No query provided".to_string()));
        }

        let rag = RagSystem::from_config(config)?;
        let result = rag.query(&self.query, self.session.as_deref()).await?;

        if self.json {
            return print_json(&result);
        }

        println!("{}", result.answer);
        if !result.sources.is_empty() {
            println!();
            println!("Sources:");
            for source in &result.sources {
                match &source.url {
                    Some(url) => println!("  - {} ({})", source.text, url),
                    None => println!("  - {}", source.text),
                }
            }
        }
        tracing::debug!("Session: {}", result.session_id);

        Ok(())
    }
}
