// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! GitHub REST metadata client.
//!
//! The query's intent is classified by keyword: anything mentioning "issue" runs
//! an issue search, anything mentioning "pull" lists pull requests. Other intents
//! are [`BackendError::Unsupported`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(feature = "telemetry")]
use tracing::debug;

use crate::error::BackendError;
use crate::telemetry::BackendSpan;

use super::MetadataClient;

/// Results returned per search.
pub const MAX_RESULTS: usize = 5;

const USER_AGENT: &str = concat!("repo-scout/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// What a metadata query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Issues,
    PullRequests,
}

impl Intent {
    /// Case-insensitive keyword classification; "issue" wins over "pull".
    pub fn classify(query: &str) -> Option<Self> {
        let lower = query.to_lowercase();
        if lower.contains("issue") {
            Some(Self::Issues)
        } else if lower.contains("pull") {
            Some(Self::PullRequests)
        } else {
            None
        }
    }
}

pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BackendError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Token from `GITHUB_TOKEN`, falling back to `GH_TOKEN`. Anonymous access works
    /// for public repositories at a lower rate limit.
    pub fn from_env(api_url: &str) -> Result<Self, BackendError> {
        let token = ["GITHUB_TOKEN", "GH_TOKEN"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|t| !t.trim().is_empty()));
        Self::new(api_url, token)
    }

    fn get(&self, url: String) -> RequestBuilder {
        let req = self
            .client
            .get(url)
            .header("accept", "application/vnd.github+json")
            .header("x-github-api-version", "2022-11-28");
        match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: for<'de> Deserialize<'de>>(&self, req: RequestBuilder) -> Result<T, BackendError> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(BackendError::api(status.as_u16(), message));
        }
        Ok(response.json().await?)
    }

    async fn search_issues(&self, repo: &str, query: &str) -> Result<Vec<IssueSummary>, BackendError> {
        let req = self.get(format!("{}/search/issues", self.api_url)).query(&[
            ("q", format!("repo:{repo} {query}")),
            ("per_page", MAX_RESULTS.to_string()),
        ]);
        let page: SearchPage = self.send(req).await?;
        Ok(page
            .items
            .into_iter()
            .take(MAX_RESULTS)
            .map(|item| IssueSummary {
                number: item.number,
                title: item.title,
                state: item.state,
                url: item.html_url,
            })
            .collect())
    }

    async fn list_pulls(&self, repo: &str) -> Result<Vec<PullSummary>, BackendError> {
        let req = self
            .get(format!("{}/repos/{repo}/pulls", self.api_url))
            .query(&[("state", "all"), ("per_page", "5")]);
        let pulls: Vec<ApiPull> = self.send(req).await?;
        Ok(pulls
            .into_iter()
            .take(MAX_RESULTS)
            .map(|pr| PullSummary {
                number: pr.number,
                title: pr.title,
                user: pr.user.map(|u| u.login).unwrap_or_default(),
                url: pr.html_url,
            })
            .collect())
    }
}

#[async_trait]
impl MetadataClient for GitHubClient {
    async fn search(&self, repo: &str, query: &str) -> Result<String, BackendError> {
        let intent = Intent::classify(query).ok_or(BackendError::Unsupported)?;

        #[cfg(feature = "telemetry")]
        debug!(repo = %repo, ?intent, "GitHub search");

        let span = BackendSpan::start("github");
        let result = match intent {
            Intent::Issues => self
                .search_issues(repo, query)
                .await
                .and_then(|items| to_json(&items)),
            Intent::PullRequests => self.list_pulls(repo).await.and_then(|items| to_json(&items)),
        };
        span.finish_with_result(&result);
        result
    }
}

fn to_json<T: Serialize>(items: &T) -> Result<String, BackendError> {
    serde_json::to_string_pretty(items).map_err(|e| BackendError::Parse(e.to_string()))
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullSummary {
    pub number: u64,
    pub title: String,
    pub user: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<ApiIssue>,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    number: u64,
    title: String,
    state: String,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiPull {
    number: u64,
    title: String,
    #[serde(default)]
    user: Option<ApiUser>,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
