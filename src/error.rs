// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for repo-scout.
//!
//! This module provides strongly-typed errors for different parts of the application,
//! using `thiserror` for ergonomic error definitions and `anyhow` for error propagation.
//!
//! Nothing inside a turn propagates these past an agent: backend and provider errors are
//! converted into response text where they occur. They surface to callers only while a
//! turn is being set up (loading configuration, building providers).

use thiserror::Error;

/// Errors that can occur during provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Response parsing error: {0}")]
    ParseError(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl ProviderError {
    /// Create an API error with status code.
    pub fn api(message: impl Into<String>, status_code: u16) -> Self {
        Self::ApiError {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create an API error without status code.
    pub fn api_message(message: impl Into<String>) -> Self {
        Self::ApiError {
            message: message.into(),
            status_code: None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(0)
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

/// Errors raised by backend adapters (structured store, VCS, hosting API, doc search).
///
/// The `Display` text of each variant is what ends up after the agent-specific prefix in
/// a response, so variants carry the detail and not a prefix of their own.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{0} is not a valid repository.")]
    NotARepository(String),

    #[error("{0}")]
    CommandFailed(String),

    #[error("{0}")]
    QueryFailed(String),

    #[error("Query returned no rows.")]
    EmptyResult,

    #[error("{0}")]
    NotConfigured(String),

    #[error("{0}")]
    Http(String),

    #[error("{status}: {message}")]
    Api { status: u16, message: String },

    #[error("Response parsing error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Query type not supported.")]
    Unsupported,
}

impl BackendError {
    /// Create an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether this error is a failed precondition rather than a failed command.
    ///
    /// Retrying with a different command cannot fix these.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NotARepository(_) | Self::NotConfigured(_))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(err: rusqlite::Error) -> Self {
        Self::QueryFailed(err.to_string())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl ConfigError {
    /// Create an invalid-value error for a field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_api() {
        let err = ProviderError::api("Bad request", 400);
        match err {
            ProviderError::ApiError { message, status_code } => {
                assert_eq!(message, "Bad request");
                assert_eq!(status_code, Some(400));
            }
            _ => panic!("Expected ApiError"),
        }
    }

    #[test]
    fn test_backend_error_display_has_no_prefix() {
        let err = BackendError::NotARepository("/tmp/x".to_string());
        assert_eq!(err.to_string(), "/tmp/x is not a valid repository.");

        let err = BackendError::CommandFailed("fatal: bad revision".to_string());
        assert_eq!(err.to_string(), "fatal: bad revision");

        assert_eq!(BackendError::EmptyResult.to_string(), "Query returned no rows.");
        assert_eq!(BackendError::api(404, "Not Found").to_string(), "404: Not Found");
    }

    #[test]
    fn test_backend_error_precondition() {
        assert!(BackendError::NotARepository("/x".to_string()).is_precondition());
        assert!(BackendError::NotConfigured("no store".to_string()).is_precondition());
        assert!(!BackendError::QueryFailed("syntax error".to_string()).is_precondition());
        assert!(!BackendError::EmptyResult.is_precondition());
    }

    #[test]
    fn test_config_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid json");
        let config_err: ConfigError = result.unwrap_err().into();
        assert!(matches!(config_err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::NotFound(_)));
    }
}
