//! Ollama LLM provider implementation.
//!
//! Uses the `/api/chat` endpoint, which supports tool calling.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{
    ChatRequest, ChatResponse, ContentBlock, LlmClient, LlmUsage, Role, StopReason,
};
use ragchat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama chat request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool>,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OllamaFunction,
}

#[derive(Debug, Serialize)]
struct OllamaFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Ollama chat response format.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// Per-request timeout, if one was configured
    timeout: Option<Duration>,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
            client: reqwest::Client::new(),
        }
    }

    /// Bound each request; local models can be slow to load.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Convert a ChatRequest to Ollama format.
    ///
    /// Ollama has no tool call ids: tool results are sent as `tool` role
    /// messages in the order the calls were made.
    fn to_ollama_request(&self, request: &ChatRequest) -> OllamaChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref system) = request.system {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.clone(),
                tool_calls: Vec::new(),
            });
        }

        for message in &request.messages {
            let mut text = Vec::new();
            let mut tool_calls = Vec::new();
            let mut tool_results = Vec::new();

            for block in &message.content {
                match block {
                    ContentBlock::Text { text: t } => text.push(t.clone()),
                    ContentBlock::ToolUse { name, input, .. } => {
                        tool_calls.push(OllamaToolCall {
                            function: OllamaFunctionCall {
                                name: name.clone(),
                                arguments: input.clone(),
                            },
                        })
                    }
                    ContentBlock::ToolResult { content, .. } => tool_results.push(content.clone()),
                }
            }

            if !text.is_empty() || !tool_calls.is_empty() {
                messages.push(OllamaMessage {
                    role: match message.role {
                        Role::User => "user".to_string(),
                        Role::Assistant => "assistant".to_string(),
                    },
                    content: text.join("\n"),
                    tool_calls,
                });
            }

            messages.extend(tool_results.into_iter().map(|content| OllamaMessage {
                role: "tool".to_string(),
                content,
                tool_calls: Vec::new(),
            }));
        }

        OllamaChatRequest {
            model: request.model.clone(),
            messages,
            tools: request
                .tools
                .iter()
                .map(|tool| OllamaTool {
                    kind: "function",
                    function: OllamaFunction {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.input_schema.clone(),
                    },
                })
                .collect(),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: Some(request.max_tokens),
            },
            stream: false,
        }
    }

    /// Convert an Ollama response to ChatResponse.
    fn convert_response(&self, response: OllamaChatResponse) -> ChatResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        let mut content = Vec::new();
        if !response.message.content.is_empty() {
            content.push(ContentBlock::text(response.message.content));
        }

        let has_tool_calls = !response.message.tool_calls.is_empty();
        for (i, call) in response.message.tool_calls.into_iter().enumerate() {
            content.push(ContentBlock::ToolUse {
                id: format!("call_{}", i),
                name: call.function.name,
                input: call.function.arguments,
            });
        }

        ChatResponse {
            content,
            stop_reason: if has_tool_calls {
                StopReason::ToolUse
            } else {
                StopReason::EndTurn
            },
            model: response.model,
            usage,
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        tracing::info!(model = %request.model, "Sending chat request to Ollama");
        tracing::debug!("Request: {:?}", request);

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| {
                AppError::UpstreamUnavailable(format!("Failed to send request to Ollama: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = format!("Ollama API error ({}): {}", status, error_text);
            return Err(if status.is_server_error() {
                AppError::UpstreamUnavailable(detail)
            } else {
                AppError::Llm(detail)
            });
        }

        let ollama_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::info!("Received chat response from Ollama");
        tracing::debug!("Response: {:?}", ollama_response);

        Ok(self.convert_response(ollama_response))
    }
}
