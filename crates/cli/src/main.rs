//! Ragchat CLI
//!
//! Main entry point for the ragchat command-line tool.
//! Serves the course chatbot over HTTP and exposes ingestion, querying and
//! preference commands for local use.

mod commands;
mod server;

use clap::{Parser, Subcommand};
use commands::{AskCommand, CoursesCommand, IngestCommand, ServeCommand, ThemeCommand};
use ragchat_core::{config::AppConfig, logging};
use std::path::PathBuf;

/// Ragchat - question answering over course materials
#[derive(Parser, Debug)]
#[command(name = "ragchat")]
#[command(about = "Retrieval-augmented chatbot for course materials", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RAGCHAT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (anthropic, ollama)
    #[arg(short, long, global = true, env = "RAGCHAT_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "RAGCHAT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API and serve the frontend
    Serve(ServeCommand),

    /// Load course documents into the vector store
    Ingest(IngestCommand),

    /// Ask a single question from the terminal
    Ask(AskCommand),

    /// List the stored courses
    Courses(CoursesCommand),

    /// Show or change the frontend theme
    Theme(ThemeCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load_with(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Ragchat starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;
    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Courses(_) => "courses",
        Commands::Theme(_) => "theme",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Courses(cmd) => cmd.execute(&config).await,
        Commands::Theme(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}
