//! LLM integration crate for ragchat.
//!
//! Provides a provider-agnostic, message-based chat abstraction with tool
//! calling. Requests and responses follow the content-block model of the
//! Anthropic Messages API; other providers translate to and from it.
//!
//! # Providers
//! - **Anthropic**: Messages API (default)
//! - **Ollama**: Local LLM runtime via `/api/chat`
//!
//! # Example
//! ```no_run
//! use ragchat_llm::{ChatMessage, ChatRequest, LlmClient, providers::AnthropicClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AnthropicClient::new(std::env::var("ANTHROPIC_API_KEY").ok());
//! let request = ChatRequest::new("claude-sonnet-4-20250514")
//!     .with_system("You are terse.")
//!     .with_message(ChatMessage::user_text("Hello"));
//! let response = client.complete(&request).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{
    ChatMessage, ChatRequest, ChatResponse, ContentBlock, LlmClient, LlmUsage, Role, StopReason,
    ToolCall, ToolChoice, ToolDefinition,
};
pub use factory::{create_client, ClientOptions};
pub use providers::{AnthropicClient, OllamaClient};
pub use types::ProviderType;
