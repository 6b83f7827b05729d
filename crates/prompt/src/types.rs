//! Prompt definitions and rendered prompts.

use serde::{Deserialize, Serialize};

/// A prompt as declared in YAML.
///
/// `system` and `template` are Handlebars templates. The user template
/// receives `query`; the system template additionally receives `history`
/// once a session has prior exchanges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDefinition {
    pub id: String,
    pub title: String,
    /// Schema version, `major.minor`
    pub api_version: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub behavior: PromptBehavior,
    /// What the user input is expected to be
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    pub template: String,
}

/// Tone and style hints recorded with a prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptBehavior {
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub style: String,
}

/// Templates rendered for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltPrompt {
    pub system: Option<String>,
    pub user: String,
    pub prompt_id: String,
    pub history_included: bool,
}
