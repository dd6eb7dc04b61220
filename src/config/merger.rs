// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.

use std::path::PathBuf;

use tracing::warn;

use super::types::{ModelRole, ResolvedConfig, WorkspaceConfig};

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub repository_path: Option<PathBuf>,
    pub github_repo: Option<String>,
    pub docs_source: Option<String>,
    pub source_db: Option<PathBuf>,
    pub no_source_code: bool,
    pub no_git: bool,
    pub no_github: bool,
    pub no_docs: bool,
}

/// Default configuration values.
pub fn default_config() -> ResolvedConfig {
    ResolvedConfig::default()
}

/// Merge multiple configurations with precedence.
///
/// Precedence (highest to lowest):
/// 1. CLI options
/// 2. File named by `CONFIG_FILE`
/// 3. Local config (.scout.local.json)
/// 4. Workspace config (.scout.json)
/// 5. Global config (~/.scout/config.json)
/// 6. Default values
pub fn merge_config(layers: impl IntoIterator<Item = Option<WorkspaceConfig>>, cli: CliOptions) -> ResolvedConfig {
    let mut result = default_config();

    for config in layers.into_iter().flatten() {
        apply_workspace_config(&mut result, &config);
    }

    apply_cli_options(&mut result, &cli);

    result
}

fn apply_workspace_config(result: &mut ResolvedConfig, config: &WorkspaceConfig) {
    if let Some(ref provider) = config.provider {
        result.provider = provider.clone();
    }

    if config.model.is_some() {
        result.model = config.model.clone();
    }

    if config.base_url.is_some() {
        result.base_url = config.base_url.clone();
    }

    if let Some(temperature) = config.temperature {
        result.temperature = temperature;
    }

    if config.max_tokens.is_some() {
        result.max_tokens = config.max_tokens;
    }

    if let Some(ref llms) = config.llms {
        for (key, llm) in llms {
            let Some(role) = ModelRole::from_key(key) else {
                warn!(key = %key, "Ignoring unknown llms role");
                continue;
            };
            result.llms.entry(role).or_default().overlay(llm);
        }
    }

    if config.repository_path.is_some() {
        result.repository_path = config.repository_path.clone();
    }

    if config.github_repo.is_some() {
        result.github_repo = config.github_repo.clone();
    }

    if config.docs_source.is_some() {
        result.docs_source = config.docs_source.clone();
    }

    if config.source_db.is_some() {
        result.source_db = config.source_db.clone();
    }

    if let Some(ref agents) = config.agents {
        let toggles = &mut result.agents;
        if let Some(v) = agents.source_code {
            toggles.source_code = v;
        }
        if let Some(v) = agents.git {
            toggles.git = v;
        }
        if let Some(v) = agents.github {
            toggles.github = v;
        }
        if let Some(v) = agents.docs {
            toggles.docs = v;
        }
    }

    if let Some(ref url) = config.github_api_url {
        result.github_api_url = url.clone();
    }

    if let Some(ref url) = config.tavily_api_url {
        result.tavily_api_url = url.clone();
    }

    if config.request_timeout_ms.is_some() {
        result.request_timeout_ms = config.request_timeout_ms;
    }
}

fn apply_cli_options(result: &mut ResolvedConfig, cli: &CliOptions) {
    if let Some(ref provider) = cli.provider {
        result.provider = provider.clone();
    }

    if cli.model.is_some() {
        result.model = cli.model.clone();
    }

    if cli.base_url.is_some() {
        result.base_url = cli.base_url.clone();
    }

    if cli.repository_path.is_some() {
        result.repository_path = cli.repository_path.clone();
    }

    if cli.github_repo.is_some() {
        result.github_repo = cli.github_repo.clone();
    }

    if cli.docs_source.is_some() {
        result.docs_source = cli.docs_source.clone();
    }

    if cli.source_db.is_some() {
        result.source_db = cli.source_db.clone();
    }

    // CLI switches only ever turn agents off.
    let toggles = &mut result.agents;
    toggles.source_code &= !cli.no_source_code;
    toggles.git &= !cli.no_git;
    toggles.github &= !cli.no_github;
    toggles.docs &= !cli.no_docs;
}
