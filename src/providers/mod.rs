// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Model provider implementations.
//!
//! - [`anthropic::AnthropicProvider`] - Claude models via Anthropic API
//! - [`openai::OpenAIProvider`] - OpenAI, Ollama, Groq, and OpenAI-compatible APIs
//!
//! Every component of a turn owns its own model handle; [`AgentModels`] builds
//! them from the per-role configuration.
//!
//! ```rust,ignore
//! use repo_scout::providers::{create_provider, ProviderType};
//! use repo_scout::types::ProviderConfig;
//!
//! let config = ProviderConfig::new("your-api-key", "gpt-4o-mini");
//! let provider = create_provider(ProviderType::OpenAI, config)?;
//! ```

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAIProvider;

use std::sync::Arc;

use crate::config::{ModelRole, ResolvedConfig};
use crate::error::ProviderError;
use crate::types::{BoxedProvider, ProviderConfig, SharedProvider};

/// Supported provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// Anthropic Claude models
    Anthropic,
    /// OpenAI GPT models
    OpenAI,
    /// Ollama local models
    Ollama,
    /// Groq-hosted models (OpenAI-compatible)
    Groq,
    /// Any OpenAI-compatible API
    OpenAICompatible,
}

impl ProviderType {
    /// Get the default model for this provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::OpenAI => "gpt-4o-mini",
            Self::Ollama => "llama3.2",
            Self::Groq => "llama-3.3-70b-versatile",
            Self::OpenAICompatible => "gpt-4o-mini",
        }
    }

    /// Get the default base URL for this provider.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com",
            Self::OpenAI => openai::OPENAI_BASE_URL,
            Self::Ollama => openai::OLLAMA_BASE_URL,
            Self::Groq => openai::GROQ_BASE_URL,
            Self::OpenAICompatible => openai::OPENAI_BASE_URL,
        }
    }

    /// Environment variable holding this provider's API key, if it uses one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::OpenAI | Self::OpenAICompatible => Some("OPENAI_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Ollama => None,
        }
    }

    /// Check if this provider requires an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Anthropic | Self::OpenAI | Self::Groq)
    }
}

/// Error type for parsing a provider type from a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProviderTypeError;

impl std::fmt::Display for ParseProviderTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid provider type")
    }
}

impl std::error::Error for ParseProviderTypeError {}

impl std::str::FromStr for ProviderType {
    type Err = ParseProviderTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "gpt" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "groq" => Ok(Self::Groq),
            "openai-compatible" | "openai_compatible" => Ok(Self::OpenAICompatible),
            _ => Err(ParseProviderTypeError),
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "Anthropic"),
            Self::OpenAI => write!(f, "OpenAI"),
            Self::Ollama => write!(f, "Ollama"),
            Self::Groq => write!(f, "Groq"),
            Self::OpenAICompatible => write!(f, "OpenAI-Compatible"),
        }
    }
}

/// Create a provider instance from type and configuration.
///
/// # Errors
///
/// Returns [`ProviderError::NotConfigured`] if a required API key or base URL is missing.
pub fn create_provider(
    provider_type: ProviderType,
    config: ProviderConfig,
) -> Result<BoxedProvider, ProviderError> {
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| provider_type.default_model().to_string());

    if provider_type.requires_api_key() && config.api_key.is_none() {
        let hint = provider_type.api_key_env().unwrap_or("an API key");
        return Err(ProviderError::NotConfigured(format!(
            "API key required for {provider_type} (set {hint})"
        )));
    }

    let base_url = match (provider_type, config.base_url.clone()) {
        (_, Some(url)) => url,
        (ProviderType::OpenAICompatible, None) => {
            return Err(ProviderError::NotConfigured(
                "base_url required for OpenAI-Compatible".to_string(),
            ))
        }
        (other, None) => other.default_base_url().to_string(),
    };

    match provider_type {
        ProviderType::Anthropic => {
            let api_key = config.api_key.clone().unwrap_or_default();
            Ok(Box::new(AnthropicProvider::new(api_key, model, base_url, config)?))
        }
        ProviderType::OpenAI | ProviderType::Groq | ProviderType::OpenAICompatible => {
            let api_key = config.api_key.clone();
            Ok(Box::new(OpenAIProvider::new(api_key, model, base_url, config)?))
        }
        // Ollama doesn't need an API key
        ProviderType::Ollama => Ok(Box::new(OpenAIProvider::new(None, model, base_url, config)?)),
    }
}

/// Create the provider for one role of a resolved configuration.
///
/// API keys are read from the environment variable for the role's provider.
pub fn create_provider_for_role(
    config: &ResolvedConfig,
    role: ModelRole,
) -> Result<BoxedProvider, ProviderError> {
    let resolved = config.model_for(role);
    let provider_type: ProviderType = resolved.provider.parse().map_err(|_| {
        ProviderError::NotConfigured(format!("Unknown provider for {role}: {}", resolved.provider))
    })?;

    let api_key = provider_type
        .api_key_env()
        .and_then(|var| std::env::var(var).ok())
        .filter(|key| !key.trim().is_empty());

    let provider_config = ProviderConfig {
        api_key,
        base_url: resolved.base_url,
        model: resolved.model,
        temperature: Some(resolved.temperature),
        max_tokens: resolved.max_tokens,
        timeout_ms: config.request_timeout_ms,
    };

    create_provider(provider_type, provider_config)
}

/// One model handle per component of a turn.
#[derive(Clone)]
pub struct AgentModels {
    pub supervisor: SharedProvider,
    pub source_code: SharedProvider,
    pub git: SharedProvider,
    pub github: SharedProvider,
    pub docs: SharedProvider,
    pub response: SharedProvider,
}

impl AgentModels {
    /// Build every role's provider from configuration.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, ProviderError> {
        let build = |role| create_provider_for_role(config, role).map(SharedProvider::from);
        Ok(Self {
            supervisor: build(ModelRole::Supervisor)?,
            source_code: build(ModelRole::SourceCode)?,
            git: build(ModelRole::Git)?,
            github: build(ModelRole::GitHub)?,
            docs: build(ModelRole::Docs)?,
            response: build(ModelRole::Response)?,
        })
    }

    /// Use the same provider for every role.
    pub fn uniform(provider: SharedProvider) -> Self {
        Self {
            supervisor: Arc::clone(&provider),
            source_code: Arc::clone(&provider),
            git: Arc::clone(&provider),
            github: Arc::clone(&provider),
            docs: Arc::clone(&provider),
            response: provider,
        }
    }

    /// Provider for a role.
    pub fn for_role(&self, role: ModelRole) -> &SharedProvider {
        match role {
            ModelRole::Supervisor => &self.supervisor,
            ModelRole::SourceCode => &self.source_code,
            ModelRole::Git => &self.git,
            ModelRole::GitHub => &self.github,
            ModelRole::Docs => &self.docs,
            ModelRole::Response => &self.response,
        }
    }
}

impl std::fmt::Debug for AgentModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for role in ModelRole::ALL {
            let p = self.for_role(role);
            map.entry(&role.key(), &format!("{}:{}", p.name(), p.model()));
        }
        map.finish()
    }
}
