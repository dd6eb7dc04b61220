// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! One question in, one answer out.
//!
//! [`TurnRunner`] owns the supervisor, the agents and the synthesizer. Each call to
//! [`TurnRunner::run`] builds a fresh [`SessionState`], runs information gathering
//! and synthesis inside a `turn` span, and returns a serializable [`TurnReport`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;

#[cfg(feature = "telemetry")]
use crate::telemetry::{metrics::GLOBAL_METRICS, TimedOperation};

use crate::agents::AgentSet;
use crate::backends::Backends;
use crate::config::ResolvedConfig;
use crate::information::{InformationOrchestrator, OrchestrationSummary, StopCause, Supervisor};
use crate::providers::AgentModels;
use crate::response::ResponseSynthesizer;
use crate::session::{AgentKind, AgentResponse, SessionState, TurnConfig, AGENT_PRIORITY};
use crate::telemetry::CorrelationId;

/// One agent's part in a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentRecord {
    pub agent: AgentKind,
    /// Sub-queries routed to the agent, oldest first.
    pub queries: Vec<String>,
    pub response: AgentResponse,
}

/// Everything a caller may want to show or store about a finished turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub turn_id: CorrelationId,
    pub query: String,
    pub answer: String,
    pub agents: Vec<AgentRecord>,
    pub rounds: u32,
    pub dispatched: Vec<AgentKind>,
    pub stop: StopCause,
    pub repairs: u32,
    pub supervisor_responses: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl TurnReport {
    fn from_session(session: SessionState, summary: OrchestrationSummary, answer: String) -> Self {
        let finished_at = Utc::now();
        let agents = AGENT_PRIORITY
            .into_iter()
            .map(|kind| {
                let slot = session.slot(kind);
                AgentRecord {
                    agent: kind,
                    queries: slot.queries.clone(),
                    response: slot.response.clone(),
                }
            })
            .collect();

        Self {
            turn_id: session.turn_id,
            query: session.user_query_text(),
            answer,
            agents,
            rounds: summary.rounds,
            dispatched: summary.dispatched,
            stop: summary.stop,
            repairs: summary.repairs,
            supervisor_responses: session.supervisor_responses,
            started_at: session.started_at,
            finished_at,
            duration_ms: (finished_at - session.started_at).num_milliseconds(),
        }
    }

    /// The record for one agent.
    pub fn agent(&self, kind: AgentKind) -> Option<&AgentRecord> {
        self.agents.iter().find(|r| r.agent == kind)
    }
}

pub struct TurnRunner {
    orchestrator: InformationOrchestrator,
    synthesizer: ResponseSynthesizer,
}

impl TurnRunner {
    pub fn new(models: AgentModels, backends: Backends) -> Self {
        let agents = AgentSet::build(&models, &backends);
        Self::with_agents(models, agents)
    }

    /// Use a custom agent set; only the supervisor and response models are taken
    /// from `models`.
    pub fn with_agents(models: AgentModels, agents: AgentSet) -> Self {
        Self {
            orchestrator: InformationOrchestrator::new(Supervisor::new(models.supervisor), agents),
            synthesizer: ResponseSynthesizer::new(models.response),
        }
    }

    /// Providers and backends as the configuration describes them.
    pub fn from_config(config: &ResolvedConfig) -> crate::error::Result<Self> {
        let models = AgentModels::from_config(config)?;
        let backends = Backends::with_endpoints(&config.github_api_url, &config.tavily_api_url)?;
        tracing::debug!(models = ?models, "Turn runner configured");
        Ok(Self::new(models, backends))
    }

    /// Answer one question. Never fails: every problem along the way ends up as
    /// answer text or as a declined agent.
    pub async fn run(&self, query: &str, config: TurnConfig, context: Vec<String>) -> TurnReport {
        let session = SessionState::new(query, config).with_context(context);
        let span = tracing::info_span!("turn", turn_id = %session.turn_id.short());
        self.run_session(session).instrument(span).await
    }

    async fn run_session(&self, mut session: SessionState) -> TurnReport {
        #[cfg(feature = "telemetry")]
        let _timer = TimedOperation::start("turn");
        tracing::info!(query = %session.user_query_text(), "Turn started");

        let summary = self.orchestrator.run(&mut session).await;
        let answer = self.synthesizer.synthesize(&mut session).await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_turn(summary.rounds, summary.repairs);

        let report = TurnReport::from_session(session, summary, answer);
        tracing::info!(
            rounds = report.rounds,
            repairs = report.repairs,
            duration_ms = report.duration_ms,
            "Turn finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedProvider;
    use crate::backends::{MockDocumentFetcher, MockMetadataClient, MockQueryExecutor, MockVcsRunner};
    use crate::response::NOT_ENOUGH_INFORMATION;
    use crate::session::AgentToggles;
    use crate::types::ProviderResponse;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn backends(vcs: MockVcsRunner) -> Backends {
        Backends {
            query: Arc::new(MockQueryExecutor::new()),
            vcs: Arc::new(vcs),
            metadata: Arc::new(MockMetadataClient::new()),
            docs: Arc::new(MockDocumentFetcher::new()),
        }
    }

    #[tokio::test]
    async fn test_git_only_turn() {
        let mut vcs = MockVcsRunner::new();
        vcs.expect_run()
            .withf(|_, command| command == "log -1 --format=%an")
            .times(1)
            .returning(|_, _| Ok("Ada Lovelace".to_string()));

        let provider = ScriptedProvider::new(vec![
            ProviderResponse::text(r#"{"git": "Who made the last commit?"}"#),
            ProviderResponse::tool_call("GitCommand", serde_json::json!({"command": "log -1 --format=%an"})),
            ProviderResponse::text(r#"{"git": "PASS"}"#),
            ProviderResponse::text("The last commit was made by Ada Lovelace."),
        ]);
        let runner = TurnRunner::new(AgentModels::uniform(provider.clone().shared()), backends(vcs));
        let config = TurnConfig {
            repository_path: Some(PathBuf::from("/repo")),
            toggles: AgentToggles::only(AgentKind::Git),
            ..Default::default()
        };

        let report = runner.run("Who made the last commit?", config, Vec::new()).await;

        assert_eq!(report.answer, "The last commit was made by Ada Lovelace.");
        assert_eq!(report.rounds, 1);
        assert_eq!(report.dispatched, vec![AgentKind::Git]);
        assert_eq!(report.stop, StopCause::NoPendingWork);
        assert_eq!(report.supervisor_responses.len(), 2);
        let git = report.agent(AgentKind::Git).unwrap();
        assert_eq!(git.response, AgentResponse::Answered("Ada Lovelace".into()));
        assert_eq!(
            report.agent(AgentKind::Docs).unwrap().response,
            AgentResponse::Declined
        );
        assert_eq!(provider.calls(), 4);
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn test_context_reaches_prompts() {
        let provider = ScriptedProvider::new(Vec::new());
        let runner = TurnRunner::new(
            AgentModels::uniform(provider.clone().shared()),
            backends(MockVcsRunner::new()),
        );

        let report = runner
            .run(
                "And before that?",
                TurnConfig::default(),
                vec!["Q: Who made the last commit?".to_string()],
            )
            .await;

        assert_eq!(report.answer, NOT_ENOUGH_INFORMATION);
        assert!(provider.requests()[0].user.contains("Q: Who made the last commit?"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stop"], "no_pending_work");
        assert_eq!(json["agents"][0]["agent"], "source_code");
    }
}
