//! Error types for ragchat.
//!
//! A single error enum covers every failure category. The retrieval and
//! generation pipeline distinguishes four of them:
//! - `NotFound`: no matching course or content, recovered locally as a message
//! - `UnknownTool`: a tool name nobody registered, fatal
//! - `BackendUnavailable`: the vector database cannot be reached
//! - `UpstreamUnavailable`: the LLM provider rejected the credentials or is unreachable

use thiserror::Error;

/// Unified error type for ragchat.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors that are not connectivity or auth failures
    #[error("LLM error: {0}")]
    Llm(String),

    /// Ingestion, parsing and tool argument errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No content matched a course or lesson filter
    #[error("{0}")]
    NotFound(String),

    /// A tool was requested that is not registered
    #[error("Tool '{0}' not found")]
    UnknownTool(String),

    /// The vector database could not be opened or queried
    #[error("Vector store unavailable: {0}")]
    BackendUnavailable(String),

    /// The LLM provider is unreachable or rejected the credentials
    #[error("LLM provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Infrastructure failures the caller should surface as "service unavailable".
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::BackendUnavailable(_) | AppError::UpstreamUnavailable(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tool_message() {
        let err = AppError::UnknownTool("nonexistent_tool".to_string());
        assert_eq!(err.to_string(), "Tool 'nonexistent_tool' not found");
    }

    #[test]
    fn test_not_found_is_bare_message() {
        let err = AppError::NotFound("No course found matching 'Rust'".to_string());
        assert_eq!(err.to_string(), "No course found matching 'Rust'");
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(AppError::BackendUnavailable("db".into()).is_unavailable());
        assert!(AppError::UpstreamUnavailable("api".into()).is_unavailable());
        assert!(!AppError::Llm("bad request".into()).is_unavailable());
    }

    #[test]
    fn test_from_serde_json() {
        let err: AppError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
