// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Source agent: answers structural questions with SQL over the source store.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;
#[cfg(feature = "telemetry")]
use std::time::Instant;

use crate::backends::QueryExecutor;
use crate::prompts;
use crate::session::AgentKind;
use crate::types::SharedProvider;

use super::repair::{CommandExecutor, Execution, RepairLoop, SQL_SPEC};
use super::{AgentOutput, AgentRequest, InformationAgent};

pub struct SourceAgent {
    model: SharedProvider,
    executor: Arc<dyn QueryExecutor>,
}

impl SourceAgent {
    pub fn new(model: SharedProvider, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { model, executor }
    }
}

/// Binds the query backend to one store for the repair loop.
struct StoreQueries<'a> {
    backend: &'a dyn QueryExecutor,
    store: Option<&'a Path>,
}

#[async_trait]
impl CommandExecutor for StoreQueries<'_> {
    async fn execute(&self, command: &str) -> Execution {
        let Some(store) = self.store else {
            return Execution::Rejected("Error: no source database configured.".to_string());
        };
        match self.backend.run(store, command).await {
            Ok(rows) => Execution::Completed(rows),
            Err(e) if e.is_precondition() => Execution::Rejected(format!("Error: {e}")),
            Err(e) => Execution::Completed(format!("Error: {e}")),
        }
    }
}

#[async_trait]
impl InformationAgent for SourceAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::SourceCode
    }

    async fn answer(&self, request: AgentRequest<'_>) -> AgentOutput {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let queries = StoreQueries {
            backend: self.executor.as_ref(),
            store: request.config.source_db.as_deref(),
        };
        let outcome = RepairLoop::new(&SQL_SPEC, &self.model, &queries)
            .run(
                &prompts::agent_system(AgentKind::SourceCode),
                &prompts::source_user(request.query, request.context),
            )
            .await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("agent.source_code", start.elapsed());

        outcome.into()
    }
}
