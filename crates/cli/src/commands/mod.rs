//! Command handlers for the ragchat CLI.

pub mod ask;
pub mod courses;
pub mod ingest;
pub mod serve;
pub mod theme;

pub use ask::AskCommand;
pub use courses::CoursesCommand;
pub use ingest::IngestCommand;
pub use serve::ServeCommand;
pub use theme::ThemeCommand;

use ragchat_core::{AppError, AppResult};
use serde::Serialize;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
