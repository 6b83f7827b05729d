//! Ingest command handler.

use crate::commands::print_json;
use clap::Args;
use ragchat_core::{config::AppConfig, AppResult};
use ragchat_knowledge::RagSystem;
use std::path::PathBuf;

/// Load course documents into the vector store
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Folder of course files (default: the configured docs folder)
    pub path: Option<PathBuf>,

    /// Remove all stored courses first
    #[arg(long)]
    pub clear: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let folder = match &self.path {
            Some(path) => config.resolve_path(path),
            None => config.docs_path(),
        };
        tracing::info!("Executing ingest command for {:?}", folder);

        let rag = RagSystem::from_config(config)?;
        let stats = rag.add_course_folder(&folder, self.clear).await?;

        if self.json {
            print_json(&stats)?;
        } else {
            println!(
                "Added {} courses ({} chunks); {} already present, {} failed",
                stats.courses_added, stats.chunks_added, stats.skipped, stats.failed
            );
        }

        Ok(())
    }
}
