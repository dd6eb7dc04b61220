// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from files.
//!
//! Handles loading configuration from JSON and YAML files in various locations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::{AgentsConfig, LlmConfig, WorkspaceConfig};

/// Config file names to search for (in order).
pub const CONFIG_FILES: &[&str] = &[
    ".scout.json",
    ".scout/config.json",
    ".scout.yaml",
    "scout.config.json",
];

/// Local config file name (for per-directory overrides).
pub const LOCAL_CONFIG_FILE: &str = ".scout.local.json";

/// Global config directory name.
pub const GLOBAL_CONFIG_DIR: &str = ".scout";

/// Global config file names, tried in order.
pub const GLOBAL_CONFIG_FILES: &[&str] = &["config.json", "config.yaml"];

/// Environment variable naming an explicit config file.
pub const CONFIG_FILE_ENV: &str = "CONFIG_FILE";

/// Get the global config directory path.
pub fn get_global_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR))
}

/// Load global configuration from ~/.scout/config.{json,yaml}.
pub fn load_global_config() -> Result<Option<WorkspaceConfig>, ConfigError> {
    let Some(dir) = get_global_config_dir() else {
        return Ok(None);
    };
    load_first_existing(&dir, GLOBAL_CONFIG_FILES)
}

/// Load workspace configuration from the workspace root.
///
/// The first file in [`CONFIG_FILES`] that exists wins.
pub fn load_workspace_config(workspace_root: &Path) -> Result<Option<WorkspaceConfig>, ConfigError> {
    load_first_existing(workspace_root, CONFIG_FILES)
}

/// Load local configuration from .scout.local.json.
pub fn load_local_config(workspace_root: &Path) -> Result<Option<WorkspaceConfig>, ConfigError> {
    load_first_existing(workspace_root, &[LOCAL_CONFIG_FILE])
}

/// Load the file named by `CONFIG_FILE`, resolved against the workspace root when relative.
///
/// Unlike the discovered files, a named file that does not exist is an error.
pub fn load_env_config(workspace_root: &Path) -> Result<Option<WorkspaceConfig>, ConfigError> {
    let Some(raw) = std::env::var_os(CONFIG_FILE_ENV) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let path = workspace_root.join(PathBuf::from(raw));
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    load_config_file(&path).map(Some)
}

fn load_first_existing(dir: &Path, names: &[&str]) -> Result<Option<WorkspaceConfig>, ConfigError> {
    for filename in names {
        let path = dir.join(filename);
        if path.exists() {
            return load_config_file(&path).map(Some);
        }
    }
    Ok(None)
}

/// Load a configuration file (JSON or YAML).
pub fn load_config_file(path: &Path) -> Result<WorkspaceConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let config: WorkspaceConfig = match extension.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };

    validate(&config).map_err(|e| match e {
        ConfigError::InvalidValue { field, message } => ConfigError::InvalidValue {
            field,
            message: format!("{message} (in {})", path.display()),
        },
        other => other,
    })?;

    Ok(config)
}

fn validate(config: &WorkspaceConfig) -> Result<(), ConfigError> {
    if let Some(t) = config.temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(ConfigError::invalid("temperature", format!("{t} is outside 0.0..=2.0")));
        }
    }
    if let Some(repo) = config.github_repo.as_deref() {
        let valid = repo
            .split_once('/')
            .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
        if !valid {
            return Err(ConfigError::invalid("githubRepo", format!("expected owner/name, got '{repo}'")));
        }
    }
    Ok(())
}

/// Save workspace configuration to a file.
pub fn save_workspace_config(
    workspace_root: &Path,
    config: &WorkspaceConfig,
    filename: Option<&str>,
) -> Result<PathBuf, ConfigError> {
    let filename = filename.unwrap_or(".scout.json");
    let path = workspace_root.join(filename);

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)?;

    Ok(path)
}

/// Write an example config into the workspace, refusing to overwrite an existing one.
pub fn init_config(
    workspace_root: &Path,
    config: Option<WorkspaceConfig>,
) -> Result<PathBuf, ConfigError> {
    let target = workspace_root.join(".scout.json");
    if target.exists() {
        return Err(ConfigError::invalid(
            "path",
            format!("{} already exists", target.display()),
        ));
    }
    let config = config.unwrap_or_else(get_example_config);
    save_workspace_config(workspace_root, &config, None)
}

/// Find the workspace root by searching for config files.
///
/// Walks up the directory tree from `start` until it finds a directory
/// containing a config file or reaches the filesystem root.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| CONFIG_FILES.iter().any(|f| dir.join(f).exists()))
        .map(Path::to_path_buf)
}

/// Get an example configuration.
pub fn get_example_config() -> WorkspaceConfig {
    let mut llms = HashMap::new();
    llms.insert(
        "supervisor".to_string(),
        LlmConfig {
            temperature: Some(0.0),
            ..Default::default()
        },
    );
    llms.insert(
        "response".to_string(),
        LlmConfig {
            model: Some("gpt-4o".to_string()),
            ..Default::default()
        },
    );

    WorkspaceConfig {
        provider: Some("openai".to_string()),
        model: Some("gpt-4o-mini".to_string()),
        llms: Some(llms),
        repository_path: Some(PathBuf::from(".")),
        github_repo: Some("owner/name".to_string()),
        docs_source: Some("docs".to_string()),
        agents: Some(AgentsConfig {
            source_code: Some(false),
            ..Default::default()
        }),
        ..Default::default()
    }
}
