// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenAI-compatible provider implementation.
//!
//! This module provides a [`Provider`] implementation for OpenAI and any
//! OpenAI-compatible API (Ollama, Groq, Together, etc.).
//!
//! # Supported Endpoints
//!
//! - **OpenAI** - `https://api.openai.com/v1` (default)
//! - **Ollama** - `http://localhost:11434/v1` (no API key needed)
//! - **Groq** - `https://api.groq.com/openai/v1`
//! - **Any OpenAI-compatible** - Just set base_url
//!
//! # API Reference
//!
//! See [OpenAI Chat Completions API](https://platform.openai.com/docs/api-reference/chat)

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

/// Default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Ollama API base URL.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Default Groq API base URL.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default max tokens if not specified.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// OpenAI-compatible provider.
pub struct OpenAIProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: Option<f32>,
    provider_name: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        api_key: Option<String>,
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

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let provider_name = Self::detect_provider_name(&base_url);

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url,
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: config.temperature,
            provider_name,
        })
    }

    /// Detect provider name from base URL.
    fn detect_provider_name(base_url: &str) -> String {
        if base_url.contains("openai.com") {
            "OpenAI".to_string()
        } else if base_url.contains("localhost:11434") || base_url.contains("ollama") {
            "Ollama".to_string()
        } else if base_url.contains("groq") {
            "Groq".to_string()
        } else if base_url.contains("together") {
            "Together".to_string()
        } else {
            "OpenAI-Compatible".to_string()
        }
    }

    /// Build the request body for the Chat Completions API.
    fn build_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        system_prompt: Option<&str>,
    ) -> ChatRequest {
        let mut api_messages: Vec<ChatMessage> = Vec::with_capacity(messages.len() + 1);

        if let Some(system) = system_prompt {
            api_messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(system.to_string()),
                tool_calls: None,
            });
        }

        api_messages.extend(messages.iter().map(ChatMessage::from));

        let tools_json: Option<Vec<ChatTool>> =
            tools.filter(|t| !t.is_empty()).map(|t| t.iter().map(ChatTool::from).collect());

        ChatRequest {
            model: self.model.clone(),
            messages: api_messages,
            tools: tools_json,
            max_tokens: Some(self.max_tokens),
            temperature: self.temperature,
            stream: Some(false),
        }
    }

    /// Handle an error response from the API.
    fn handle_error_response(&self, status_code: u16, body: &str) -> ProviderError {
        if let Ok(error) = serde_json::from_str::<ApiError>(body) {
            let message = error.error.message;
            match error.error.error_type.as_deref() {
                Some("authentication_error") | Some("invalid_api_key") => {
                    ProviderError::AuthError(message)
                }
                Some("rate_limit_error") | Some("rate_limit_exceeded") => {
                    ProviderError::RateLimited(message)
                }
                Some("model_not_found") => ProviderError::ModelNotFound(message),
                _ => ProviderError::api(message, status_code),
            }
        } else if status_code == 401 {
            ProviderError::AuthError(body.to_string())
        } else if status_code == 429 {
            ProviderError::RateLimited(body.to_string())
        } else {
            ProviderError::api(body.to_string(), status_code)
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        system_prompt: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(messages, tools, system_prompt);
        let start = Instant::now();
        let operation_name = format!("{}.chat", self.provider_name.to_lowercase().replace(' ', "_"));

        #[cfg(feature = "telemetry")]
        debug!(model = %self.model, messages = messages.len(), "Sending chat request");

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("content-type", "application/json");

        if let Some(ref api_key) = self.api_key {
            req = req.header("authorization", format!("Bearer {}", api_key));
        }

        let response = req
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            #[cfg(feature = "telemetry")]
            GLOBAL_METRICS.record_operation(&operation_name, start.elapsed());
            return Err(self.handle_error_response(status.as_u16(), &error_text));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let provider_response: ProviderResponse = api_response.into();

        #[cfg(feature = "telemetry")]
        {
            GLOBAL_METRICS.record_operation(&operation_name, start.elapsed());
            if let Some(ref usage) = provider_response.usage {
                GLOBAL_METRICS.record_tokens(usage.input_tokens as u64, usage.output_tokens as u64);
            }
        }
        #[cfg(not(feature = "telemetry"))]
        let _ = (start, operation_name);

        Ok(provider_response)
    }

    fn supports_tool_use(&self) -> bool {
        !self.model.contains("instruct")
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// API Types
// ============================================================================

/// Chat completion request.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// A message in the Chat API format.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
}

/// Tool call in a message.
#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    call_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<ChatFunction>,
}

/// Function details in a tool call.
#[derive(Debug, Serialize, Deserialize)]
struct ChatFunction {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<String>,
}

/// Tool definition in Chat API format.
#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: ChatToolFunction,
}

/// Function definition within a tool.
#[derive(Debug, Serialize)]
struct ChatToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

/// A choice in the response.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

/// Token usage.
#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// API error response.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

// ============================================================================
// Type Conversions
// ============================================================================

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };

        Self {
            role: role.to_string(),
            content: Some(msg.content.clone()),
            tool_calls: None,
        }
    }
}

impl From<&ToolDefinition> for ChatTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: ChatToolFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: serde_json::to_value(&tool.input_schema).unwrap_or_default(),
            },
        }
    }
}

impl From<ChatResponse> for ProviderResponse {
    fn from(response: ChatResponse) -> Self {
        let usage = response.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        let Some(choice) = response.choices.into_iter().next() else {
            return Self {
                usage,
                ..Self::empty()
            };
        };

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(idx, tc)| {
                let func = tc.function?;
                let name = func.name?;
                // Malformed argument JSON becomes Null so callers fall back to defaults.
                let input: serde_json::Value = func
                    .arguments
                    .and_then(|s| serde_json::from_str(&s).ok())
                    .unwrap_or_default();
                let id = tc.id.unwrap_or_else(|| format!("call_{idx}"));
                Some(ToolCall { id, name, input })
            })
            .collect();

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        Self {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            stop_reason,
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InputSchema;

    fn provider(base_url: &str) -> OpenAIProvider {
        OpenAIProvider::new(None, "gpt-4o-mini", base_url, ProviderConfig::default()).unwrap()
    }

    #[test]
    fn test_provider_name_detection() {
        assert_eq!(provider(OPENAI_BASE_URL).name(), "OpenAI");
        assert_eq!(provider(OLLAMA_BASE_URL).name(), "Ollama");
        assert_eq!(provider(GROQ_BASE_URL).name(), "Groq");
        assert_eq!(provider("https://llm.internal/v1").name(), "OpenAI-Compatible");
    }

    #[test]
    fn test_build_request_includes_system_and_tools() {
        let p = provider(OPENAI_BASE_URL);
        let tool = ToolDefinition::new("GitCommand", "A git command").with_schema(
            InputSchema::new().with_property("command", serde_json::json!({"type": "string"})),
        );
        let request = p.build_request(&[Message::user("hi")], Some(&[tool]), Some("be terse"));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.tools.as_ref().map(|t| t.len()), Some(1));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["tools"][0]["function"]["name"], "GitCommand");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_build_request_omits_empty_tools() {
        let p = provider(OPENAI_BASE_URL);
        let request = p.build_request(&[Message::user("hi")], Some(&[]), None);
        assert!(request.tools.is_none());
    }

    #[test]
    fn test_response_conversion_with_tool_call() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "GeneratedQuery", "arguments": "{\"sql\": \"SELECT name FROM uml_class\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7}
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        let response: ProviderResponse = parsed.into();
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        let call = response.find_tool_call("GeneratedQuery").unwrap();
        assert_eq!(call.string_arg("sql"), Some("SELECT name FROM uml_class"));
        assert_eq!(response.usage.unwrap().total(), 19);
    }

    #[test]
    fn test_response_conversion_malformed_arguments() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [{"function": {"name": "GitCommand", "arguments": "{not json"}}]
                },
                "finish_reason": "stop"
            }]
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        let response: ProviderResponse = parsed.into();
        let call = response.find_tool_call("GitCommand").unwrap();
        assert_eq!(call.id, "call_0");
        assert!(call.input.is_null());
        assert_eq!(call.string_arg("command"), None);
    }

    #[test]
    fn test_response_conversion_no_choices() {
        let parsed: ChatResponse = serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        let response: ProviderResponse = parsed.into();
        assert!(response.content.is_empty());
        assert!(!response.has_tool_calls());
    }

    #[test]
    fn test_auth_error() {
        let p = provider(OPENAI_BASE_URL);
        let body = r#"{"error": {"message": "Incorrect API key", "type": "invalid_api_key"}}"#;
        assert!(matches!(p.handle_error_response(401, body), ProviderError::AuthError(_)));
    }

    #[test]
    fn test_rate_limited() {
        let p = provider(OPENAI_BASE_URL);
        let body = r#"{"error": {"message": "Slow down", "type": "rate_limit_exceeded"}}"#;
        assert!(matches!(p.handle_error_response(429, body), ProviderError::RateLimited(_)));
        assert!(matches!(p.handle_error_response(429, "busy"), ProviderError::RateLimited(_)));
    }

    #[test]
    fn test_api_error_plain_body() {
        let p = provider(OPENAI_BASE_URL);
        match p.handle_error_response(500, "upstream exploded") {
            ProviderError::ApiError { message, status_code } => {
                assert_eq!(message, "upstream exploded");
                assert_eq!(status_code, Some(500));
            }
            other => panic!("Expected ApiError, got {other:?}"),
        }
    }
}
