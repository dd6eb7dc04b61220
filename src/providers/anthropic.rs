// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Anthropic Claude provider implementation.
//!
//! Uses the Messages API. Tool definitions are forwarded as-is; agents use them
//! as a structured-output channel for generated commands.
//!
//! See [Anthropic Messages API](https://docs.anthropic.com/en/api/messages) for details.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[cfg(feature = "telemetry")]
use tracing::debug;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use crate::error::ProviderError;
use crate::types::{
    Message, Provider, ProviderConfig, ProviderResponse, Role, StopReason, TokenUsage, ToolCall,
    ToolDefinition,
};

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default max tokens if not specified.
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Anthropic API key
    /// * `model` - Model identifier (e.g., "claude-sonnet-4-20250514")
    /// * `base_url` - API base URL
    /// * `config` - Additional configuration options
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        config: ProviderConfig,
    ) -> Result<Self, ProviderError> {
        let timeout = config
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: config.temperature,
        })
    }

    /// Build the request body for the Messages API.
    ///
    /// System messages in the history are folded into the `system` field, which is
    /// the only place the Messages API accepts them.
    fn build_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        system_prompt: Option<&str>,
    ) -> AnthropicRequest {
        let mut system_parts: Vec<&str> = system_prompt.into_iter().collect();
        let mut api_messages = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                Role::User => api_messages.push(ApiMessage::new("user", &msg.content)),
                Role::Assistant => api_messages.push(ApiMessage::new("assistant", &msg.content)),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        let api_tools: Option<Vec<ApiTool>> =
            tools.filter(|t| !t.is_empty()).map(|t| t.iter().map(ApiTool::from).collect());

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: api_messages,
            system,
            tools: api_tools,
            temperature: self.temperature,
        }
    }

    fn handle_error_response(&self, status_code: u16, body: &str) -> ProviderError {
        let Ok(error) = serde_json::from_str::<ApiError>(body) else {
            return ProviderError::api(body.to_string(), status_code);
        };
        let message = error.error.message;
        match error.error.error_type.as_str() {
            "authentication_error" => ProviderError::AuthError(message),
            "rate_limit_error" => ProviderError::RateLimited(message),
            "overloaded_error" => ProviderError::RateLimited("API overloaded".to_string()),
            "invalid_request_error" if message.contains("model") => ProviderError::ModelNotFound(message),
            "not_found_error" => ProviderError::ModelNotFound(message),
            _ => ProviderError::api(message, status_code),
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        system_prompt: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(messages, tools, system_prompt);
        let start = Instant::now();

        #[cfg(feature = "telemetry")]
        debug!(model = %self.model, messages = messages.len(), "Sending chat request");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            #[cfg(feature = "telemetry")]
            GLOBAL_METRICS.record_operation("anthropic.chat", start.elapsed());
            return Err(self.handle_error_response(status.as_u16(), &error_text));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let provider_response: ProviderResponse = api_response.into();

        #[cfg(feature = "telemetry")]
        {
            GLOBAL_METRICS.record_operation("anthropic.chat", start.elapsed());
            if let Some(ref usage) = provider_response.usage {
                GLOBAL_METRICS.record_tokens(usage.input_tokens as u64, usage.output_tokens as u64);
            }
        }
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Ok(provider_response)
    }

    fn name(&self) -> &str {
        "Anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

impl ApiMessage {
    fn new(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

/// A content block in a Messages API response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

// ============================================================================
// Type Conversions
// ============================================================================

impl From<&ToolDefinition> for ApiTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: serde_json::to_value(&tool.input_schema).unwrap_or_default(),
        }
    }
}

impl From<ApiResponse> for ProviderResponse {
    fn from(response: ApiResponse) -> Self {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                ApiContentBlock::Text { text } => content.push_str(&text),
                ApiContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall { id, name, input });
                }
                ApiContentBlock::Other => {}
            }
        }

        let stop_reason = match response.stop_reason.as_deref() {
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        Self {
            content,
            tool_calls,
            stop_reason,
            usage: Some(TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(
            "test-key",
            "claude-sonnet-4-20250514",
            "https://api.anthropic.com/",
            ProviderConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(provider().base_url, "https://api.anthropic.com");
    }

    #[test]
    fn test_system_messages_fold_into_system_field() {
        let p = provider();
        let messages = vec![
            Message::system("Conversation so far: none"),
            Message::user("Who wrote the parser?"),
        ];
        let request = p.build_request(&messages, None, Some("You route questions."));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(
            request.system.as_deref(),
            Some("You route questions.\n\nConversation so far: none")
        );
        assert!(request.tools.is_none());
    }

    #[test]
    fn test_response_conversion() {
        let raw = serde_json::json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Running it."},
                {"type": "tool_use", "id": "toolu_1", "name": "GitCommand", "input": {"command": "log -3"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 30, "output_tokens": 10}
        });
        let parsed: ApiResponse = serde_json::from_value(raw).unwrap();
        let response: ProviderResponse = parsed.into();
        assert_eq!(response.content, "Running it.");
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(
            response.find_tool_call("GitCommand").and_then(|c| c.string_arg("command")),
            Some("log -3")
        );
        assert_eq!(response.usage.map(|u| u.total()), Some(40));
    }

    #[test]
    fn test_error_mapping() {
        let p = provider();
        let auth = r#"{"type":"error","error":{"type":"authentication_error","message":"bad key"}}"#;
        assert!(matches!(p.handle_error_response(401, auth), ProviderError::AuthError(_)));

        let overloaded = r#"{"type":"error","error":{"type":"overloaded_error","message":"busy"}}"#;
        assert!(matches!(p.handle_error_response(529, overloaded), ProviderError::RateLimited(_)));

        let model = r#"{"type":"error","error":{"type":"invalid_request_error","message":"model: nope"}}"#;
        assert!(matches!(p.handle_error_response(400, model), ProviderError::ModelNotFound(_)));

        assert!(matches!(
            p.handle_error_response(502, "<html>bad gateway</html>"),
            ProviderError::ApiError { status_code: Some(502), .. }
        ));
    }
}
