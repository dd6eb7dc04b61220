// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Backend adapters the information agents execute against.
//!
//! Each backend is an async trait so agents can be tested against mocks:
//!
//! | Trait | Implementation | Used by |
//! |-------|----------------|---------|
//! | [`QueryExecutor`] | [`SqliteExecutor`] | source agent |
//! | [`VcsRunner`] | [`GitRunner`] | git agent |
//! | [`MetadataClient`] | [`GitHubClient`] | GitHub agent |
//! | [`DocumentFetcher`] | [`RoutedDocumentFetcher`] over [`TavilyFetcher`] and [`LocalDocsFetcher`] | docs agent |
//!
//! Backends return [`BackendError`]; turning errors into answer text is the agents' job.

pub mod docs;
pub mod git;
pub mod github;
pub mod sql;

pub use docs::{LocalDocsFetcher, RoutedDocumentFetcher, TavilyFetcher, NO_CONTENT};
pub use git::GitRunner;
pub use github::GitHubClient;
pub use sql::SqliteExecutor;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::error::BackendError;

/// Runs a read-only query against the structured source store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Returns rows rendered as a Python-style list of tuples.
    async fn run(&self, store: &Path, query: &str) -> Result<String, BackendError>;
}

/// Runs a version-control command in a working directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VcsRunner: Send + Sync {
    /// `command` excludes the binary name. Returns trimmed stdout.
    async fn run(&self, workdir: &Path, command: &str) -> Result<String, BackendError>;
}

/// Searches repository metadata (issues, pull requests) on the hosting service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// `repo` is `owner/name`. Returns a JSON list of at most five items.
    async fn search(&self, repo: &str, query: &str) -> Result<String, BackendError>;
}

/// Retrieves documentation passages relevant to a query.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Returns at most five passages joined by blank lines, or [`NO_CONTENT`].
    async fn fetch<'a>(&self, source: Option<&'a str>, query: &str) -> Result<String, BackendError>;
}

/// The four backends a turn uses.
#[derive(Clone)]
pub struct Backends {
    pub query: Arc<dyn QueryExecutor>,
    pub vcs: Arc<dyn VcsRunner>,
    pub metadata: Arc<dyn MetadataClient>,
    pub docs: Arc<dyn DocumentFetcher>,
}

impl Backends {
    /// Concrete adapters with the given API endpoints.
    pub fn with_endpoints(github_api_url: &str, tavily_api_url: &str) -> Result<Self, BackendError> {
        Ok(Self {
            query: Arc::new(SqliteExecutor::new()),
            vcs: Arc::new(GitRunner::new()),
            metadata: Arc::new(GitHubClient::from_env(github_api_url)?),
            docs: Arc::new(RoutedDocumentFetcher::new(
                TavilyFetcher::from_env(tavily_api_url)?,
                LocalDocsFetcher::new(),
            )),
        })
    }
}

/// Truncate output by lines, keeping the first and last halves.
pub fn truncate_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let total = lines.len();
    if total <= max_lines {
        return output.to_string();
    }

    let keep = max_lines / 2;
    let omitted = total - keep * 2;
    format!(
        "{}\n\n... [{omitted} lines omitted] ...\n\n{}",
        lines[..keep].join("\n"),
        lines[total - keep..].join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_output_short_input_untouched() {
        assert_eq!(truncate_output("a\nb\nc", 10), "a\nb\nc");
    }

    #[test]
    fn test_truncate_output_keeps_head_and_tail() {
        let input: Vec<String> = (1..=10).map(|i| format!("line {i}")).collect();
        let out = truncate_output(&input.join("\n"), 4);
        assert!(out.starts_with("line 1\nline 2\n"));
        assert!(out.ends_with("line 9\nline 10"));
        assert!(out.contains("[6 lines omitted]"));
    }
}
