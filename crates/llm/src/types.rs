//! LLM provider identification.

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Anthropic,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    /// Whether requests need an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Anthropic)
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Anthropic => crate::providers::anthropic::DEFAULT_BASE_URL,
            Self::Ollama => "http://localhost:11434",
        }
    }
}
