// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core types shared by providers and agents.
//!
//! This module defines messages, tool definitions, provider responses, and the
//! [`Provider`] trait every model backend implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ProviderError;

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A text message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

// ============================================================================
// Tool Definitions
// ============================================================================

/// JSON Schema for tool input parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String, // Always "object"
    pub properties: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl InputSchema {
    /// Create a new input schema with object type.
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: None,
        }
    }

    /// Add a property to the schema.
    pub fn with_property(mut self, name: impl Into<String>, schema: serde_json::Value) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Mark properties as required.
    pub fn with_required(mut self, required: Vec<String>) -> Self {
        self.required = Some(required);
        self
    }
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Definition of a tool the model may call.
///
/// Agents use single-tool definitions as a structured-output channel: the generated
/// command arrives as the tool call's arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::new(),
        }
    }

    /// Set the input schema for this tool.
    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }
}

/// A call to a tool made by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

impl ToolCall {
    /// Read a string argument, ignoring blank values.
    pub fn string_arg(&self, key: &str) -> Option<&str> {
        self.input
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// ============================================================================
// Token Usage & Provider Response
// ============================================================================

/// Token usage information from a provider response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the input/prompt
    pub input_tokens: u32,
    /// Number of tokens in the output/completion
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Get total tokens (input + output).
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Reason why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

/// Response from a model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Main text content of the response
    pub content: String,
    /// Tool calls made by the model
    pub tool_calls: Vec<ToolCall>,
    /// Reason for stopping generation
    pub stop_reason: StopReason,
    /// Token usage information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ProviderResponse {
    /// Create an empty response (end of turn, no content).
    pub fn empty() -> Self {
        Self {
            content: String::new(),
            tool_calls: Vec::new(),
            stop_reason: StopReason::EndTurn,
            usage: None,
        }
    }

    /// Create a text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::empty()
        }
    }

    /// Create a response carrying a single tool call.
    pub fn tool_call(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "call_0".to_string(),
                name: name.into(),
                input,
            }],
            stop_reason: StopReason::ToolUse,
            usage: None,
        }
    }

    /// Check if this response contains tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Find the first tool call with the given name.
    pub fn find_tool_call(&self, name: &str) -> Option<&ToolCall> {
        self.tool_calls.iter().find(|call| call.name == name)
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for a provider instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL for the API endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model identifier to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Request timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ProviderConfig {
    /// Create a new provider config with API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            model: Some(model.into()),
            ..Default::default()
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Trait that all model providers implement.
///
/// Callers inside a turn must treat both the `Err` case and the content of an `Ok`
/// response as untrusted: the content may be empty, contain no tool call, or not be
/// valid JSON.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send a chat completion request to the model.
    ///
    /// # Arguments
    /// * `messages` - Conversation messages
    /// * `tools` - Optional tool definitions for structured output
    /// * `system_prompt` - Optional system prompt
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        system_prompt: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Check if this provider supports tool use / function calling.
    fn supports_tool_use(&self) -> bool {
        true
    }

    /// Get the name of this provider for display purposes.
    fn name(&self) -> &str;

    /// Get the current model being used.
    fn model(&self) -> &str;
}

/// A boxed provider for dynamic dispatch.
pub type BoxedProvider = Box<dyn Provider>;

/// Arc-wrapped provider for shared ownership.
pub type SharedProvider = std::sync::Arc<dyn Provider>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello, world!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, world!");
    }

    #[test]
    fn test_tool_definition() {
        let tool = ToolDefinition::new("GeneratedQuery", "A SQL query")
            .with_schema(
                InputSchema::new()
                    .with_property("sql", serde_json::json!({"type": "string"}))
                    .with_required(vec!["sql".to_string()]),
            );

        assert_eq!(tool.name, "GeneratedQuery");
        assert!(tool.input_schema.properties.contains_key("sql"));
    }

    #[test]
    fn test_find_tool_call_and_string_arg() {
        let response = ProviderResponse::tool_call("GitCommand", serde_json::json!({"command": " log -3 "}));
        assert!(response.has_tool_calls());
        let call = response.find_tool_call("GitCommand").unwrap();
        assert_eq!(call.string_arg("command"), Some("log -3"));
        assert!(response.find_tool_call("Other").is_none());
    }

    #[test]
    fn test_string_arg_rejects_blank_and_non_string() {
        let call = ToolCall {
            id: "1".to_string(),
            name: "GeneratedQuery".to_string(),
            input: serde_json::json!({"sql": "   ", "n": 3}),
        };
        assert_eq!(call.string_arg("sql"), None);
        assert_eq!(call.string_arg("n"), None);
        assert_eq!(call.string_arg("missing"), None);
    }

    #[test]
    fn test_token_usage() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_string(&Message::user("test")).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"content\":\"test\""));
    }
}
