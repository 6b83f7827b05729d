//! Prompt system for ragchat.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, built in or overridden per workspace
//! - Handlebars template rendering
//! - Conversation history injection

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, load_prompt, COURSE_ASSISTANT};
pub use types::{BuiltPrompt, PromptBehavior, PromptDefinition};
