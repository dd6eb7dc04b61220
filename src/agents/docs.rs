// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Docs agent: retrieves passages, then has the model summarize only those.

use async_trait::async_trait;
use std::sync::Arc;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;
#[cfg(feature = "telemetry")]
use std::time::Instant;

use crate::backends::DocumentFetcher;
use crate::prompts;
use crate::session::AgentKind;
use crate::types::{Message, SharedProvider};

use super::{AgentOutput, AgentRequest, InformationAgent};

/// Answer when the summary step produced nothing.
pub const NO_SUMMARY: &str = "No summary available.";

pub struct DocsAgent {
    model: SharedProvider,
    fetcher: Arc<dyn DocumentFetcher>,
}

impl DocsAgent {
    pub fn new(model: SharedProvider, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self { model, fetcher }
    }
}

#[async_trait]
impl InformationAgent for DocsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Docs
    }

    async fn answer(&self, request: AgentRequest<'_>) -> AgentOutput {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let documents = match self
            .fetcher
            .fetch(request.config.docs_source.as_deref(), request.query)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Document fetch failed");
                format!("Failed to fetch documents: {e}")
            }
        };

        // The summary still runs on a failed fetch so the failure gets reported.
        let system = prompts::agent_system(AgentKind::Docs);
        let messages = [Message::user(prompts::docs_user(
            request.query,
            request.context,
            &documents,
        ))];
        let summary = match self.model.chat(&messages, None, Some(&system)).await {
            Ok(response) => prompts::remove_think_blocks(&response.content),
            Err(e) => {
                tracing::warn!(error = %e, "Docs summary failed");
                String::new()
            }
        };

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("agent.docs", start.elapsed());

        if summary.is_empty() {
            AgentOutput::text(NO_SUMMARY)
        } else {
            AgentOutput::text(summary)
        }
    }
}
