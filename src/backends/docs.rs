// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Documentation retrieval.
//!
//! A docs source is either a site (searched through the Tavily API, restricted to
//! that domain) or a local directory of text documents. [`RoutedDocumentFetcher`]
//! picks between the two per call.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

#[cfg(feature = "telemetry")]
use tracing::debug;

use crate::error::BackendError;
use crate::telemetry::BackendSpan;

use super::DocumentFetcher;

/// Returned when a search finds nothing.
pub const NO_CONTENT: &str = "Unable to find relevant content.";

/// Passages returned per fetch.
pub const MAX_PASSAGES: usize = 5;

/// Extensions the local fetcher reads.
pub const DOC_EXTENSIONS: &[&str] = &["md", "markdown", "txt", "rst", "adoc"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

fn join_passages(passages: Vec<String>) -> String {
    if passages.is_empty() {
        NO_CONTENT.to_string()
    } else {
        passages.join("\n\n")
    }
}

// ============================================================================
// Tavily web search
// ============================================================================

pub struct TavilyFetcher {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl TavilyFetcher {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Key from `TAVILY_API_KEY`. A missing key is reported when a fetch is attempted.
    pub fn from_env(api_url: &str) -> Result<Self, BackendError> {
        let api_key = std::env::var("TAVILY_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::new(api_url, api_key)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    include_raw_content: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    include_domains: Vec<&'a str>,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TavilyError {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

#[async_trait]
impl DocumentFetcher for TavilyFetcher {
    async fn fetch<'a>(&self, source: Option<&'a str>, query: &str) -> Result<String, BackendError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::NotConfigured("TAVILY_API_KEY is not set".to_string()))?;

        let request = SearchRequest {
            api_key,
            query,
            search_depth: "advanced",
            include_raw_content: true,
            include_domains: source.into_iter().collect(),
            max_results: MAX_PASSAGES,
        };

        #[cfg(feature = "telemetry")]
        debug!(source = ?source, "Tavily search");

        let span = BackendSpan::start("tavily");
        let result = self.search(&request).await;
        span.finish_with_result(&result);
        result
    }
}

impl TavilyFetcher {
    async fn search(&self, request: &SearchRequest<'_>) -> Result<String, BackendError> {
        let response = self
            .client
            .post(format!("{}/search", self.api_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TavilyError>(&body)
                .ok()
                .and_then(|e| e.detail)
                .map(|d| match d {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or(body);
            return Err(BackendError::api(status.as_u16(), message));
        }

        let parsed: SearchResponse = response.json().await?;
        let passages = parsed
            .results
            .into_iter()
            .filter_map(|r| r.content)
            .filter(|c| !c.trim().is_empty())
            .take(MAX_PASSAGES)
            .collect();
        Ok(join_passages(passages))
    }
}

// ============================================================================
// Local directory
// ============================================================================

/// Keyword retrieval over a directory of documents.
#[derive(Debug, Clone, Default)]
pub struct LocalDocsFetcher;

impl LocalDocsFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentFetcher for LocalDocsFetcher {
    async fn fetch<'a>(&self, source: Option<&'a str>, query: &str) -> Result<String, BackendError> {
        let root = source
            .map(PathBuf::from)
            .filter(|p| p.is_dir())
            .ok_or_else(|| BackendError::NotConfigured("docs source is not a directory".to_string()))?;

        let span = BackendSpan::start("local_docs");
        let query = query.to_string();
        let result = tokio::task::spawn_blocking(move || search_directory(&root, &query))
            .await
            .map_err(|e| BackendError::Io(format!("docs scan failed: {e}")))
            .and_then(|r| r);
        span.finish_with_result(&result);
        result
    }
}

fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

/// Number of distinct query terms the passage mentions.
fn score(passage: &str, terms: &[String]) -> usize {
    let lower = passage.to_lowercase();
    terms.iter().filter(|t| lower.contains(t.as_str())).count()
}

fn is_doc_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| DOC_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Scan `root` for the passages that best match `query`.
pub fn search_directory(root: &Path, query: &str) -> Result<String, BackendError> {
    let terms = query_terms(query);
    if terms.is_empty() {
        return Ok(NO_CONTENT.to_string());
    }

    let mut scored: Vec<(usize, String)> = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || !is_doc_file(entry.path()) {
            continue;
        }
        // Unreadable or non-UTF-8 files are skipped.
        let Ok(text) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        for passage in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            let hits = score(passage, &terms);
            if hits > 0 {
                scored.push((hits, format!("[{}]\n{passage}", rel.display())));
            }
        }
    }

    // Stable sort keeps file order among equal scores.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    #[cfg(feature = "telemetry")]
    debug!(root = %root.display(), matches = scored.len(), "Local docs scanned");

    Ok(join_passages(
        scored.into_iter().take(MAX_PASSAGES).map(|(_, p)| p).collect(),
    ))
}

// ============================================================================
// Routing
// ============================================================================

/// Sends directory sources to the local fetcher and everything else to web search.
pub struct RoutedDocumentFetcher<W = TavilyFetcher, L = LocalDocsFetcher> {
    web: W,
    local: L,
}

impl<W, L> RoutedDocumentFetcher<W, L> {
    pub fn new(web: W, local: L) -> Self {
        Self { web, local }
    }
}

/// Whether a docs source names a local directory.
pub fn is_local_source(source: &str) -> bool {
    !source.starts_with("http://") && !source.starts_with("https://") && Path::new(source).is_dir()
}

#[async_trait]
impl<W: DocumentFetcher, L: DocumentFetcher> DocumentFetcher for RoutedDocumentFetcher<W, L> {
    async fn fetch<'a>(&self, source: Option<&'a str>, query: &str) -> Result<String, BackendError> {
        match source {
            Some(dir) if is_local_source(dir) => self.local.fetch(source, query).await,
            _ => self.web.fetch(source, query).await,
        }
    }
}
