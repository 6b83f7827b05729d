//! Configuration management for ragchat.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.ragchat/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric. Every relative path in it
//! (vector database, course documents, frontend assets) is resolved against
//! the workspace root, never against the process working directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".ragchat";

/// Default Anthropic model used when nothing else is configured.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .ragchat/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// LLM provider ("anthropic" or "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Retrieval and generation settings
    pub rag: RagSettings,

    /// HTTP server settings
    pub server: ServerSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Anthropic {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        #[serde(rename = "apiVersion")]
        api_version: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            Self::Anthropic { model, .. } | Self::Ollama { model, .. } => model,
        }
    }
}

/// Retrieval-augmented generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RagSettings {
    /// Target chunk size in characters
    pub chunk_size: usize,

    /// Characters of trailing context carried into the next chunk
    pub chunk_overlap: usize,

    /// Maximum search results returned to the model per tool call
    pub max_results: usize,

    /// Number of (query, answer) exchanges retained per session
    pub max_history: usize,

    /// Maximum sequential tool rounds before the model must answer
    pub max_tool_rounds: usize,

    /// Sampling temperature for answer generation
    pub temperature: f32,

    /// Token cap for each model response
    pub max_tokens: u32,

    /// SQLite vector database, relative to the workspace
    pub db_path: PathBuf,

    /// Folder of course documents ingested on startup, relative to the workspace
    pub docs_path: PathBuf,

    /// Static frontend directory, relative to the workspace
    pub frontend_path: PathBuf,

    /// Embedding provider settings
    pub embedding: EmbeddingConfig,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            max_results: 5,
            max_history: 2,
            max_tool_rounds: 2,
            temperature: 0.0,
            max_tokens: 800,
            db_path: PathBuf::from(STATE_DIR).join("vector.sqlite"),
            docs_path: PathBuf::from("docs"),
            frontend_path: PathBuf::from("frontend"),
            embedding: EmbeddingConfig::default(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum batch size for embedding requests
    pub batch_size: usize,

    /// Provider endpoint, for network-backed providers
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: 100,
            endpoint: None,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    rag: Option<RagSettings>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var).map(PathBuf::from)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "anthropic".to_string(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            rag: RagSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the workspace config file and the environment.
    ///
    /// Environment variables:
    /// - `RAGCHAT_WORKSPACE`: Override workspace path
    /// - `RAGCHAT_CONFIG`: Path to config file
    /// - `RAGCHAT_PROVIDER`: LLM provider
    /// - `RAGCHAT_MODEL`: Model identifier
    /// - `ANTHROPIC_API_KEY`: API key for the anthropic provider
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use ragchat_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Vector store: {:?}", config.db_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration with an explicit workspace and config file.
    ///
    /// Both take precedence over their environment variables and decide which
    /// YAML file is read, so they have to be known before loading.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("RAGCHAT_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("RAGCHAT_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("RAGCHAT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("RAGCHAT_MODEL") {
            config.model = model;
        }

        if config.api_key.is_none() {
            config.api_key = config.resolve_api_key(&config.provider);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var_os("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.clone().merge(config_file))
    }

    fn merge(mut self, config_file: ConfigFile) -> Self {
        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        if let Some(rag) = config_file.rag {
            self.rag = rag;
        }

        if let Some(server) = config_file.server {
            self.server = server;
        }

        if let Some(llm) = config_file.llm {
            self.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                self.model = provider_config.model().to_string();
            }

            self.llm = Some(llm);
        }

        self
    }

    /// Apply CLI overrides to the loaded configuration.
    ///
    /// Command-line flags take precedence over environment variables and the config file.
    /// Switching provider re-resolves the API key and, unless a model is also given,
    /// picks up the model the config file declares for that provider.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            if provider != self.provider {
                if let Some(declared) = self.get_provider_config(&provider) {
                    self.model = declared.model().to_string();
                }
                self.api_key = self.resolve_api_key(&provider);
                self.provider = provider;
            }
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the .ragchat directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .ragchat directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Resolve a configured path against the workspace root.
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.resolve_path(&self.rag.db_path)
    }

    pub fn docs_path(&self) -> PathBuf {
        self.resolve_path(&self.rag.docs_path)
    }

    pub fn frontend_path(&self) -> PathBuf {
        self.resolve_path(&self.rag.frontend_path)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.state_dir().join("preferences.json")
    }

    /// Get the configuration block for a provider, if the config file declared one.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref()?.providers.get(provider)
    }

    /// Endpoint override for the given provider.
    pub fn provider_endpoint(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider)? {
            ProviderConfig::Anthropic { endpoint, .. } => endpoint.clone(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.clone()),
        }
    }

    /// Anthropic API version override for the given provider.
    pub fn provider_api_version(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider)? {
            ProviderConfig::Anthropic { api_version, .. } => api_version.clone(),
            ProviderConfig::Ollama { .. } => None,
        }
    }

    /// Request timeout in seconds for the given provider.
    pub fn provider_timeout(&self, provider: &str) -> Option<u64> {
        match self.get_provider_config(provider)? {
            ProviderConfig::Ollama { timeout, .. } => *timeout,
            ProviderConfig::Anthropic { .. } => None,
        }
    }

    /// Resolve the API key from the provider's configured environment variable.
    ///
    /// Falls back to `ANTHROPIC_API_KEY` for the anthropic provider. Empty values
    /// count as unset.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::Anthropic { api_key_env, .. }) => api_key_env.clone(),
            Some(ProviderConfig::Ollama { .. }) => return None,
            None if provider == "anthropic" => "ANTHROPIC_API_KEY".to_string(),
            None => return None,
        };

        std::env::var(&env_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate configuration for the active provider.
    ///
    /// A missing API key is not a validation failure: the server still starts
    /// and reports the provider as unavailable per request.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["anthropic", "ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }

        if self.rag.max_results == 0 {
            return Err(AppError::Config("maxResults must be at least 1".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.model, DEFAULT_ANTHROPIC_MODEL);
        assert_eq!(config.rag.chunk_size, 800);
        assert_eq!(config.rag.chunk_overlap, 100);
        assert_eq!(config.rag.max_results, 5);
        assert_eq!(config.rag.max_history, 2);
        assert_eq!(config.rag.max_tokens, 800);
        assert_eq!(config.rag.temperature, 0.0);
        assert_eq!(config.server.port, 8000);
        assert!(!config.verbose);
    }

    #[test]
    fn test_state_dir() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(".ragchat"));
    }

    #[test]
    fn test_paths_anchor_to_workspace() {
        let config = AppConfig {
            workspace: PathBuf::from("/srv/course-bot"),
            ..AppConfig::default()
        };

        assert_eq!(
            config.frontend_path(),
            PathBuf::from("/srv/course-bot/frontend")
        );
        assert_eq!(
            config.db_path(),
            PathBuf::from("/srv/course-bot/.ragchat/vector.sqlite")
        );
        assert_eq!(
            config.resolve_path(Path::new("/abs/docs")),
            PathBuf::from("/abs/docs")
        );
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: ollama
  providers:
    ollama:
      endpoint: http://localhost:11434
      model: qwen2.5
rag:
  chunkSize: 500
  maxResults: 3
  docsPath: course-docs
server:
  port: 9100
logging:
  level: debug
  color: false
"#,
        )
        .unwrap();

        let config = AppConfig {
            workspace: temp.path().to_path_buf(),
            ..AppConfig::default()
        };
        let merged = config.merge_yaml(&path).unwrap();

        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "qwen2.5");
        assert_eq!(
            merged.provider_endpoint("ollama").as_deref(),
            Some("http://localhost:11434")
        );
        assert_eq!(merged.rag.chunk_size, 500);
        assert_eq!(merged.rag.chunk_overlap, 100);
        assert_eq!(merged.rag.max_results, 3);
        assert_eq!(merged.docs_path(), temp.path().join("course-docs"));
        assert_eq!(merged.server.port, 9100);
        assert_eq!(merged.server.host, "127.0.0.1");
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert!(merged.no_color);
    }

    #[test]
    fn test_load_with_reads_workspace_config() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(STATE_DIR)).unwrap();
        std::fs::write(
            temp.path().join(STATE_DIR).join("config.yaml"),
            "rag:\n  chunkSize: 500\n",
        )
        .unwrap();

        let config = AppConfig::load_with(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.rag.chunk_size, 500);
    }

    #[test]
    fn test_load_with_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(STATE_DIR)).unwrap();
        std::fs::write(
            temp.path().join(STATE_DIR).join("config.yaml"),
            "rag:\n  chunkSize: 500\n",
        )
        .unwrap();
        let custom = temp.path().join("custom.yaml");
        std::fs::write(&custom, "rag:\n  chunkSize: 650\n").unwrap();

        let config =
            AppConfig::load_with(Some(temp.path().to_path_buf()), Some(custom.clone())).unwrap();
        assert_eq!(config.config_file, Some(custom));
        assert_eq!(config.rag.chunk_size, 650);
    }

    #[test]
    fn test_load_with_missing_workspace() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_with(Some(temp.path().join("nope")), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_provider_override_resolves_key_and_model() {
        let config = AppConfig {
            api_key: Some("sk-anthropic".to_string()),
            llm: Some(LlmConfig {
                active_provider: "anthropic".to_string(),
                providers: HashMap::from([(
                    "ollama".to_string(),
                    ProviderConfig::Ollama {
                        endpoint: "http://localhost:11434".to_string(),
                        model: "qwen2.5".to_string(),
                        timeout: Some(30),
                    },
                )]),
            }),
            ..AppConfig::default()
        };

        let switched = config.with_overrides(Some("ollama".to_string()), None, None, false, false);
        assert_eq!(switched.provider, "ollama");
        assert_eq!(switched.model, "qwen2.5");
        assert_eq!(switched.api_key, None);
        assert_eq!(switched.provider_timeout("ollama"), Some(30));
    }

    #[test]
    fn test_same_provider_keeps_key() {
        let config = AppConfig {
            api_key: Some("sk-anthropic".to_string()),
            ..AppConfig::default()
        };
        let kept = config.with_overrides(Some("anthropic".to_string()), None, None, false, false);
        assert_eq!(kept.api_key.as_deref(), Some("sk-anthropic"));
    }

    #[test]
    fn test_provider_connection_settings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: anthropic
  providers:
    anthropic:
      apiKeyEnv: RAGCHAT_TEST_UNSET_KEY
      model: claude-test
      apiVersion: "2024-10-22"
    ollama:
      endpoint: http://gpu-box:11434
      model: llama3.2
      timeout: 90
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(
            merged.provider_api_version("anthropic").as_deref(),
            Some("2024-10-22")
        );
        assert_eq!(merged.provider_timeout("anthropic"), None);
        assert_eq!(merged.provider_timeout("ollama"), Some(90));
        assert_eq!(merged.provider_api_version("ollama"), None);
    }

    #[test]
    fn test_merge_yaml_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "rag: [not, a, map]").unwrap();

        let config = AppConfig::default();
        assert!(matches!(config.merge_yaml(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let config = AppConfig {
            provider: "unknown".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_overlap() {
        let mut config = AppConfig::default();
        config.rag.chunk_overlap = config.rag.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_without_api_key() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ollama_has_no_api_key() {
        let config = AppConfig::default();
        assert_eq!(config.resolve_api_key("ollama"), None);
    }
}
