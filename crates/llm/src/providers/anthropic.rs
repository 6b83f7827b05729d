//! Anthropic Messages API provider.
//!
//! API reference: https://docs.anthropic.com/en/api/messages

use crate::client::{
    ChatRequest, ChatResponse, ContentBlock, LlmClient, LlmUsage, StopReason,
};
use ragchat_core::{AppError, AppResult};
use reqwest::StatusCode;
use std::time::Duration;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// API version header value.
pub const API_VERSION: &str = "2023-06-01";

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Anthropic LLM client.
pub struct AnthropicClient {
    base_url: String,
    api_key: Option<String>,
    api_version: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client against the public API.
    ///
    /// A missing key is accepted here; every request then fails with
    /// `AppError::UpstreamUnavailable` before touching the network.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            api_version: API_VERSION.to_string(),
            client,
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the JSON body for the Messages API.
    fn build_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "max_tokens": request.max_tokens,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if let Some(ref system) = request.system {
            body["system"] = serde_json::Value::String(system.clone());
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(request.tools);
            if let Some(choice) = request.tool_choice {
                body["tool_choice"] = serde_json::json!(choice);
            }
        }

        body
    }

    /// Parse a Messages API response body.
    fn parse_response(&self, resp: &serde_json::Value, model: &str) -> AppResult<ChatResponse> {
        let blocks = resp
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| AppError::Llm("No content in Anthropic response".to_string()))?;

        let mut content = Vec::with_capacity(blocks.len());
        for block in blocks {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                        content.push(ContentBlock::text(text));
                    }
                }
                Some("tool_use") => {
                    if let (Some(id), Some(name)) = (
                        block.get("id").and_then(|v| v.as_str()),
                        block.get("name").and_then(|v| v.as_str()),
                    ) {
                        content.push(ContentBlock::ToolUse {
                            id: id.to_string(),
                            name: name.to_string(),
                            input: block
                                .get("input")
                                .cloned()
                                .unwrap_or_else(|| serde_json::json!({})),
                        });
                    }
                }
                other => {
                    tracing::debug!(block_type = ?other, "Skipping unsupported content block");
                }
            }
        }

        let stop_reason = resp
            .get("stop_reason")
            .and_then(|s| s.as_str())
            .map(StopReason::parse)
            .unwrap_or(StopReason::EndTurn);

        let usage = resp
            .get("usage")
            .map(|u| {
                let input = u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                let output = u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                LlmUsage::new(input, output)
            })
            .unwrap_or_default();

        let model = resp
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(model)
            .to_string();

        Ok(ChatResponse {
            content,
            stop_reason,
            model,
            usage,
        })
    }
}

/// Map a non-success HTTP status to the error taxonomy.
///
/// Auth failures, rate limiting and server-side outages mean the provider is
/// unavailable to us; anything else is a request the provider rejected.
fn status_error(status: StatusCode, body: &str) -> AppError {
    let detail = format!("Anthropic API error ({}): {}", status, body);
    match status.as_u16() {
        401 | 403 | 429 | 529 => AppError::UpstreamUnavailable(detail),
        code if code >= 500 => AppError::UpstreamUnavailable(detail),
        _ => AppError::Llm(detail),
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::UpstreamUnavailable("ANTHROPIC_API_KEY is not set".to_string())
        })?;

        let url = format!("{}/messages", self.base_url);
        let body = self.build_body(request);

        tracing::info!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending request to Anthropic"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::UpstreamUnavailable(format!("Failed to reach Anthropic API: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, &error_text));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Anthropic response: {}", e)))?;

        let parsed = self.parse_response(&resp_json, &request.model)?;

        tracing::info!(
            stop_reason = ?parsed.stop_reason,
            input_tokens = parsed.usage.prompt_tokens,
            output_tokens = parsed.usage.completion_tokens,
            "Received response from Anthropic"
        );

        Ok(parsed)
    }
}
