//! Embedding providers for course text.
//!
//! The provider is chosen by the `rag.embedding` configuration section.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use ragchat_core::config::EmbeddingConfig;
