// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! Defines the structure of workspace and resolved configuration,
//! supporting JSON and YAML formats.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::session::{AgentToggles, TurnConfig};

/// Default sampling temperature applied when no source sets one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default GitHub REST endpoint.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default Tavily search endpoint.
pub const DEFAULT_TAVILY_API_URL: &str = "https://api.tavily.com";

/// Workspace configuration for repo-scout.
/// Can be defined in .scout.json, .scout/config.json, .scout.yaml or scout.config.json.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Provider to use (openai, anthropic, ollama, groq, openai-compatible)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Model name to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Custom base URL for API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Per-role model overrides, keyed by role name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llms: Option<HashMap<String, LlmConfig>>,

    /// Local git checkout the VCS agent runs in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_path: Option<PathBuf>,

    /// Hosted repository identifier (`owner/name`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,

    /// Documentation site domain or local docs directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_source: Option<String>,

    /// SQLite store holding the extracted source model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_db: Option<PathBuf>,

    /// Agent enable/disable switches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents: Option<AgentsConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_api_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tavily_api_url: Option<String>,

    /// HTTP timeout for model calls, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

/// Model settings for one role. Every field is optional; gaps fall back to the
/// top-level provider settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl LlmConfig {
    /// Overlay `other` on top of `self`, field by field.
    pub fn overlay(&mut self, other: &LlmConfig) {
        if other.provider.is_some() {
            self.provider = other.provider.clone();
        }
        if other.model.is_some() {
            self.model = other.model.clone();
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url.clone();
        }
        if other.temperature.is_some() {
            self.temperature = other.temperature;
        }
        if other.max_tokens.is_some() {
            self.max_tokens = other.max_tokens;
        }
    }
}

/// Agent switches as written in a config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_code: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<bool>,
}

/// A component that owns its own model handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    Supervisor,
    SourceCode,
    Git,
    GitHub,
    Docs,
    Response,
}

impl ModelRole {
    pub const ALL: [ModelRole; 6] = [
        ModelRole::Supervisor,
        ModelRole::SourceCode,
        ModelRole::Git,
        ModelRole::GitHub,
        ModelRole::Docs,
        ModelRole::Response,
    ];

    /// Canonical config key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Supervisor => "supervisor",
            Self::SourceCode => "source_code",
            Self::Git => "git",
            Self::GitHub => "github",
            Self::Docs => "docs",
            Self::Response => "response",
        }
    }

    /// Parse a config key, accepting the `information_*` aliases.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "supervisor" | "information_supervisor" => Some(Self::Supervisor),
            "source_code" | "information_source_code" => Some(Self::SourceCode),
            "git" | "information_git" => Some(Self::Git),
            "github" | "information_github" => Some(Self::GitHub),
            "docs" | "information_docs" => Some(Self::Docs),
            "response" => Some(Self::Response),
            _ => None,
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Fully resolved model settings for one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedModel {
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// Resolved configuration with all defaults applied.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Per-role overrides, already keyed by canonical role
    pub llms: HashMap<ModelRole, LlmConfig>,
    pub repository_path: Option<PathBuf>,
    pub github_repo: Option<String>,
    pub docs_source: Option<String>,
    pub source_db: Option<PathBuf>,
    pub agents: AgentToggles,
    pub github_api_url: String,
    pub tavily_api_url: String,
    pub request_timeout_ms: Option<u64>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            base_url: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            llms: HashMap::new(),
            repository_path: None,
            github_repo: None,
            docs_source: None,
            source_db: None,
            agents: AgentToggles::default(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            tavily_api_url: DEFAULT_TAVILY_API_URL.to_string(),
            request_timeout_ms: None,
        }
    }
}

impl ResolvedConfig {
    /// Model settings for a role, with gaps filled from the top-level settings.
    ///
    /// A role that switches provider without naming a model or base URL does not
    /// inherit the top-level ones, since those belong to a different provider.
    pub fn model_for(&self, role: ModelRole) -> ResolvedModel {
        let Some(over) = self.llms.get(&role) else {
            return ResolvedModel {
                provider: self.provider.clone(),
                model: self.model.clone(),
                base_url: self.base_url.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };
        };

        let switches_provider = over
            .provider
            .as_deref()
            .is_some_and(|p| !p.eq_ignore_ascii_case(&self.provider));

        let (model, base_url) = if switches_provider {
            (over.model.clone(), over.base_url.clone())
        } else {
            (
                over.model.clone().or_else(|| self.model.clone()),
                over.base_url.clone().or_else(|| self.base_url.clone()),
            )
        };

        ResolvedModel {
            provider: over.provider.clone().unwrap_or_else(|| self.provider.clone()),
            model,
            base_url,
            temperature: over.temperature.unwrap_or(self.temperature),
            max_tokens: over.max_tokens.or(self.max_tokens),
        }
    }

    /// Per-turn inputs derived from this configuration.
    pub fn turn_config(&self) -> TurnConfig {
        TurnConfig {
            repository_path: self.repository_path.clone(),
            github_repo: self.github_repo.clone(),
            docs_source: self.docs_source.clone(),
            source_db: self.source_db.clone(),
            toggles: self.agents,
        }
    }
}
