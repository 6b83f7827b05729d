//! Prompt loader for YAML prompt definitions.
//!
//! Prompts ship built into the binary. A workspace can override any of them
//! by placing `<id>.yml` in `.ragchat/prompts/`.

use crate::types::PromptDefinition;
use ragchat_core::config::STATE_DIR;
use ragchat_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Identifier of the course assistant prompt.
pub const COURSE_ASSISTANT: &str = "course.assistant";

/// Prompts compiled into the binary, as (id, YAML source).
const BUILTIN_PROMPTS: &[(&str, &str)] = &[(
    COURSE_ASSISTANT,
    include_str!("../prompts/course.assistant.yml"),
)];

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// Load a prompt definition by ID.
///
/// Looks for `.ragchat/prompts/<id>.yml` in the workspace first and falls
/// back to the built-in definition.
///
/// # Example
/// ```no_run
/// use ragchat_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "course.assistant")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        let definition = parse_prompt(&contents, &prompt_file.display().to_string())?;
        tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);
        return Ok(definition);
    }

    builtin_prompt(prompt_id)?.ok_or_else(|| {
        AppError::Prompt(format!(
            "Prompt '{}' not found (no built-in and no {:?})",
            prompt_id, prompt_file
        ))
    })
}

/// Parse the built-in definition for `prompt_id`, if one exists.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<Option<PromptDefinition>> {
    BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .map(|(id, source)| parse_prompt(source, &format!("built-in {}", id)))
        .transpose()
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
