//! Answer generation with tool calling.
//!
//! A query moves through `Sent -> [ToolRequested -> ToolExecuted]* -> Answered`.
//! Failed tool calls are reported back to the model as error results so it
//! can still answer; only provider failures end the generation early.

use crate::tools::ToolManager;
use ragchat_core::config::RagSettings;
use ragchat_core::{AppError, AppResult};
use ragchat_llm::{ChatMessage, ChatRequest, ChatResponse, ContentBlock, LlmClient};
use ragchat_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Answer used when the model's final response has no text.
pub const FALLBACK_ANSWER: &str = "I couldn't generate a response.";

const DEFAULT_MAX_TOKENS: u32 = 800;
const DEFAULT_MAX_TOOL_ROUNDS: usize = 2;

enum GenerationState {
    Sent,
    ToolRequested(ChatResponse),
    ToolExecuted,
    Answered(String),
}

/// Generates answers from a language model, executing its tool calls.
pub struct AiGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    max_tokens: u32,
    temperature: f32,
    max_tool_rounds: usize,
}

impl AiGenerator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Apply token, temperature and tool-round limits from settings.
    pub fn with_settings(mut self, settings: &RagSettings) -> Self {
        self.max_tokens = settings.max_tokens;
        self.temperature = settings.temperature;
        self.max_tool_rounds = settings.max_tool_rounds;
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate an answer to `query`.
    ///
    /// `history` is the formatted prior conversation. When `tools` is given
    /// its definitions are offered to the model and its source list ends up
    /// holding the sources of the last tool executed.
    ///
    /// # Errors
    /// `UpstreamUnavailable` when the provider cannot be reached or rejects
    /// the credentials, `UnknownTool` when the model calls a tool that is
    /// not registered.
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        mut tools: Option<&mut ToolManager>,
    ) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        let built = build_prompt(&self.prompt, variables, history)?;

        let mut request = ChatRequest::new(&self.model)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_message(ChatMessage::user_text(built.user));
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(manager) = tools.as_deref() {
            if self.max_tool_rounds > 0 {
                request = request.with_tools(manager.tool_definitions());
            }
        }

        let mut rounds = 0;
        let mut state = GenerationState::Sent;

        loop {
            state = match state {
                GenerationState::Sent | GenerationState::ToolExecuted => {
                    let response = self.client.complete(&request).await?;
                    if response.wants_tools() && !request.tools.is_empty() {
                        GenerationState::ToolRequested(response)
                    } else {
                        GenerationState::Answered(answer_text(&response))
                    }
                }

                GenerationState::ToolRequested(response) => {
                    let manager = tools.as_deref_mut().ok_or_else(|| {
                        AppError::Other("Model requested tools but none are available".to_string())
                    })?;

                    let mut results = Vec::new();
                    for call in response.tool_calls() {
                        tracing::info!("Model requested tool '{}'", call.name);
                        let block = match manager.execute(&call.name, &call.input).await {
                            Ok(output) => ContentBlock::tool_result(&call.id, output),
                            Err(e @ AppError::UnknownTool(_)) => return Err(e),
                            Err(e) => {
                                tracing::warn!("Tool '{}' failed: {}", call.name, e);
                                ContentBlock::tool_error(
                                    &call.id,
                                    format!("Tool execution failed: {}", e),
                                )
                            }
                        };
                        results.push(block);
                    }

                    request.messages.push(ChatMessage::assistant(response.content));
                    request.messages.push(ChatMessage::tool_results(results));

                    rounds += 1;
                    if rounds >= self.max_tool_rounds {
                        request = request.without_tools();
                    }
                    GenerationState::ToolExecuted
                }

                GenerationState::Answered(answer) => {
                    tracing::debug!("Answered after {} tool rounds", rounds);
                    return Ok(answer);
                }
            };
        }
    }
}

fn answer_text(response: &ChatResponse) -> String {
    let text = response.text();
    if text.trim().is_empty() {
        FALLBACK_ANSWER.to_string()
    } else {
        text
    }
}
