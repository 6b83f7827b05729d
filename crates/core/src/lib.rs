//! Ragchat Core Library
//!
//! This crate provides the foundational utilities shared by every ragchat crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (workspace-anchored paths, RAG and server settings)
//! - Persisted UI preferences (theme)

pub mod config;
pub mod error;
pub mod logging;
pub mod preferences;

// Re-export commonly used types
pub use config::{AppConfig, RagSettings, ServerSettings};
pub use error::{AppError, AppResult};
pub use preferences::{PreferenceStore, Theme};
