//! Prompt builder: renders a definition's templates with request variables.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use ragchat_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// `history` is the session's prior exchanges, already formatted. When
/// present it is exposed to the system template as `{{history}}`.
///
/// # Example
/// ```no_run
/// use ragchat_prompt::{build_prompt, load_prompt};
/// use std::collections::HashMap;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = load_prompt(Path::new("."), "course.assistant")?;
/// let mut vars = HashMap::new();
/// vars.insert("query".to_string(), "What is MCP?".to_string());
///
/// let built = build_prompt(&def, vars, None)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    mut variables: HashMap<String, String>,
    history: Option<&str>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let history_included = match history {
        Some(h) if !h.trim().is_empty() => {
            variables.insert("history".to_string(), h.to_string());
            true
        }
        _ => false,
    };

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?
        .map(|s| s.trim_end().to_string());

    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        prompt_id: definition.id.clone(),
        history_included,
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
