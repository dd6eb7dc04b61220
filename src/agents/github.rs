// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! GitHub agent: turns a question into an issue or pull-request search.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;
#[cfg(feature = "telemetry")]
use std::time::Instant;

use crate::backends::MetadataClient;
use crate::error::BackendError;
use crate::prompts;
use crate::session::AgentKind;
use crate::types::{InputSchema, Message, SharedProvider, ToolDefinition};

use super::{AgentOutput, AgentRequest, InformationAgent};

const TOOL_NAME: &str = "GitHubQuery";
const FALLBACK_QUERY: &str = "issue";

pub struct GitHubAgent {
    model: SharedProvider,
    client: Arc<dyn MetadataClient>,
}

impl GitHubAgent {
    pub fn new(model: SharedProvider, client: Arc<dyn MetadataClient>) -> Self {
        Self { model, client }
    }

    fn tool() -> ToolDefinition {
        ToolDefinition::new(TOOL_NAME, "Submit the GitHub search query.").with_schema(
            InputSchema::new()
                .with_property(
                    "query",
                    json!({"type": "string", "description": "Search over issues or pull requests."}),
                )
                .with_required(vec!["query".to_string()]),
        )
    }

    async fn search_query(&self, request: &AgentRequest<'_>, repo: &str) -> String {
        let system = prompts::agent_system(AgentKind::GitHub);
        let messages = [Message::user(prompts::github_user(request.query, repo, request.context))];
        let tools = [Self::tool()];

        match self.model.chat(&messages, Some(&tools), Some(&system)).await {
            Ok(response) => response
                .find_tool_call(TOOL_NAME)
                .and_then(|call| call.string_arg("query"))
                .map(str::to_string)
                .unwrap_or_else(|| {
                    tracing::warn!("Model returned no GitHub query, using fallback");
                    FALLBACK_QUERY.to_string()
                }),
            Err(e) => {
                tracing::warn!(error = %e, "GitHub query generation failed, using fallback");
                FALLBACK_QUERY.to_string()
            }
        }
    }
}

#[async_trait]
impl InformationAgent for GitHubAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::GitHub
    }

    async fn answer(&self, request: AgentRequest<'_>) -> AgentOutput {
        let Some(repo) = request.config.github_repo.as_deref() else {
            return AgentOutput::text("GitHub error: no repository configured.");
        };

        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let query = self.search_query(&request, repo).await;
        tracing::debug!(repo, query = %query, "GitHub search query");

        let text = match self.client.search(repo, &query).await {
            Ok(json) => json,
            Err(e @ BackendError::Unsupported) => e.to_string(),
            Err(e) => format!("GitHub error: {e}"),
        };

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("agent.github", start.elapsed());

        AgentOutput::text(text)
    }
}
