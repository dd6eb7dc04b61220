// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module for repo-scout.
//!
//! Handles loading, merging, and validation of configuration from multiple sources:
//! - Global config: ~/.scout/config.json (or config.yaml)
//! - Workspace config: .scout.json, .scout/config.json, .scout.yaml, or scout.config.json
//! - Local config: .scout.local.json (gitignored, for personal overrides)
//! - Explicit file: the path in `CONFIG_FILE`
//! - CLI options: command-line arguments
//!
//! Configuration is merged with precedence (CLI > CONFIG_FILE > local > workspace > global > defaults).
//! API keys are never read from files; providers and backends take them from the environment.

mod loader;
mod merger;
mod types;

pub use loader::{
    find_workspace_root, get_example_config, get_global_config_dir, init_config, load_config_file,
    load_env_config, load_global_config, load_local_config, load_workspace_config,
    save_workspace_config, CONFIG_FILES, CONFIG_FILE_ENV, GLOBAL_CONFIG_DIR, LOCAL_CONFIG_FILE,
};

pub use merger::{default_config, merge_config, CliOptions};

pub use types::{
    AgentsConfig, LlmConfig, ModelRole, ResolvedConfig, ResolvedModel, WorkspaceConfig,
    DEFAULT_GITHUB_API_URL, DEFAULT_TAVILY_API_URL, DEFAULT_TEMPERATURE,
};

use crate::error::ConfigError;
use std::path::Path;

/// Load and merge all configuration sources for a workspace.
///
/// This is the main entry point for configuration loading.
pub fn load_config(
    workspace_root: &Path,
    cli_options: CliOptions,
) -> Result<ResolvedConfig, ConfigError> {
    let global = load_global_config()?;
    let workspace = load_workspace_config(workspace_root)?;
    let local = load_local_config(workspace_root)?;
    let explicit = load_env_config(workspace_root)?;

    Ok(merge_config([global, workspace, local, explicit], cli_options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_with_no_files() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), CliOptions::default()).unwrap();
        // Provider could come from a global config; just check it resolved.
        assert!(!config.provider.is_empty());
    }

    #[test]
    fn test_load_config_with_workspace_and_local() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".scout.json"),
            r#"{"provider": "groq", "model": "llama-3.3-70b-versatile", "githubRepo": "acme/widgets"}"#,
        )
        .unwrap();
        std::fs::write(
            temp.path().join(".scout.local.json"),
            r#"{"agents": {"github": false}}"#,
        )
        .unwrap();

        let config = load_config(temp.path(), CliOptions::default()).unwrap();
        assert_eq!(config.provider, "groq");
        assert_eq!(config.github_repo.as_deref(), Some("acme/widgets"));
        assert!(!config.agents.github);
    }

    #[test]
    fn test_load_config_cli_override() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".scout.json"), r#"{"provider": "openai"}"#).unwrap();

        let cli = CliOptions {
            provider: Some("anthropic".to_string()),
            no_git: true,
            ..Default::default()
        };

        let config = load_config(temp.path(), cli).unwrap();
        assert_eq!(config.provider, "anthropic");
        assert!(!config.agents.git);
    }
}
