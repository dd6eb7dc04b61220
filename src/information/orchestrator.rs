// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The information control loop.
//!
//! Each round the supervisor routes, then exactly one pending agent runs. The loop
//! ends when nothing is pending or after [`MAX_INFORMATION_ROUNDS`] dispatches.
//! An agent whose response is settled is never dispatched again, so every agent
//! runs at most once per turn.

use serde::Serialize;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;
#[cfg(feature = "telemetry")]
use std::time::Instant;

use crate::agents::{AgentRequest, AgentSet};
use crate::session::{AgentKind, AgentResponse, SessionState, AGENT_PRIORITY};

use super::supervisor::Supervisor;

/// Upper bound on dispatches per turn.
pub const MAX_INFORMATION_ROUNDS: u32 = 3;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCause {
    NoPendingWork,
    RoundCeiling,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestrationSummary {
    pub rounds: u32,
    /// Agents in the order they ran.
    pub dispatched: Vec<AgentKind>,
    pub stop: StopCause,
    /// Command repairs across all agents.
    pub repairs: u32,
}

pub struct InformationOrchestrator {
    supervisor: Supervisor,
    agents: AgentSet,
}

/// Whether `kind` should run: enabled, a real sub-query waiting, not yet settled.
pub fn is_pending(session: &SessionState, kind: AgentKind) -> bool {
    session.config.toggles.is_enabled(kind) && session.slot(kind).has_pending_query()
}

/// The highest-priority pending agent.
pub fn next_pending(session: &SessionState) -> Option<AgentKind> {
    AGENT_PRIORITY.into_iter().find(|kind| is_pending(session, *kind))
}

impl InformationOrchestrator {
    pub fn new(supervisor: Supervisor, agents: AgentSet) -> Self {
        Self { supervisor, agents }
    }

    pub async fn run(&self, session: &mut SessionState) -> OrchestrationSummary {
        for kind in AGENT_PRIORITY {
            if !session.config.toggles.is_enabled(kind) {
                session.set_response(kind, AgentResponse::Declined);
            }
        }

        let mut dispatched = Vec::new();
        let mut repairs = 0;

        let stop = loop {
            self.supervisor.route(session).await;

            if session.rounds() >= MAX_INFORMATION_ROUNDS {
                break StopCause::RoundCeiling;
            }
            let Some(kind) = next_pending(session) else {
                break StopCause::NoPendingWork;
            };

            repairs += self.dispatch(session, kind).await;
            dispatched.push(kind);
            session.increment_round();
        };

        tracing::info!(rounds = session.rounds(), stop = ?stop, "Information gathering finished");

        OrchestrationSummary {
            rounds: session.rounds(),
            dispatched,
            stop,
            repairs,
        }
    }

    /// Run one agent and settle its response. Returns the repairs it made.
    async fn dispatch(&self, session: &mut SessionState, kind: AgentKind) -> u32 {
        let query = session.slot(kind).current_query().unwrap_or_default().to_string();
        tracing::info!(agent = %kind, round = session.rounds() + 1, query = %query, "Dispatching agent");

        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let output = self
            .agents
            .get(kind)
            .answer(AgentRequest {
                query: &query,
                context: &session.context,
                config: &session.config,
            })
            .await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("orchestrator.dispatch", start.elapsed());

        let response = AgentResponse::settle(output.text);
        tracing::debug!(agent = %kind, answered = response.is_filled(), "Agent settled");
        session.set_response(kind, response);
        output.repairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedProvider;
    use crate::agents::{AgentOutput, InformationAgent};
    use crate::session::{AgentToggles, TurnConfig};
    use crate::types::ProviderResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedAgent {
        kind: AgentKind,
        reply: &'static str,
        calls: AtomicUsize,
    }

    impl FixedAgent {
        fn new(kind: AgentKind, reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InformationAgent for FixedAgent {
        fn kind(&self) -> AgentKind {
            self.kind
        }

        async fn answer(&self, _request: AgentRequest<'_>) -> AgentOutput {
            self.calls.fetch_add(1, Ordering::SeqCst);
            AgentOutput::text(self.reply)
        }
    }

    struct Fixture {
        agents: [Arc<FixedAgent>; 4],
    }

    impl Fixture {
        fn new(replies: [&'static str; 4]) -> Self {
            Self {
                agents: [
                    FixedAgent::new(AgentKind::SourceCode, replies[0]),
                    FixedAgent::new(AgentKind::Git, replies[1]),
                    FixedAgent::new(AgentKind::GitHub, replies[2]),
                    FixedAgent::new(AgentKind::Docs, replies[3]),
                ],
            }
        }

        fn orchestrator(&self, supervisor: ScriptedProvider) -> InformationOrchestrator {
            let [s, g, h, d] = self.agents.clone();
            InformationOrchestrator::new(
                Supervisor::new(supervisor.shared()),
                AgentSet::new(s, g, h, d),
            )
        }

        fn calls(&self) -> Vec<usize> {
            self.agents.iter().map(|a| a.calls()).collect()
        }
    }

    fn route(json: &str) -> ProviderResponse {
        ProviderResponse::text(json)
    }

    fn session(toggles: AgentToggles) -> SessionState {
        SessionState::new(
            "q",
            TurnConfig {
                toggles,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_priority_order_and_no_pending_stop() {
        let fixture = Fixture::new(["[('Foo',)]", "abc fix", "[]", "docs"]);
        let supervisor = ScriptedProvider::new(vec![
            route(r#"{"git": "last commit", "source_code": "classes"}"#),
            route(r#"{"git": "last commit"}"#),
            route(r#"{"source_code": "PASS", "git": "PASS", "github": "PASS", "docs": "PASS"}"#),
        ]);
        let mut s = session(AgentToggles::default());

        let summary = fixture.orchestrator(supervisor).run(&mut s).await;

        assert_eq!(summary.dispatched, vec![AgentKind::SourceCode, AgentKind::Git]);
        assert_eq!(summary.stop, StopCause::NoPendingWork);
        assert_eq!(summary.rounds, 2);
        assert_eq!(fixture.calls(), vec![1, 1, 0, 0]);
        assert_eq!(s.response(AgentKind::Git), &AgentResponse::Answered("abc fix".into()));
        assert_eq!(s.response(AgentKind::Docs), &AgentResponse::NotStarted);
        assert_eq!(s.supervisor_responses.len(), 3);
    }

    #[tokio::test]
    async fn test_round_ceiling() {
        let fixture = Fixture::new(["a", "b", "c", "d"]);
        let supervisor = ScriptedProvider::new(vec![route(
            r#"{"source_code": "1", "git": "2", "github": "3", "docs": "4"}"#,
        )]);
        let mut s = session(AgentToggles::default());

        let summary = fixture.orchestrator(supervisor).run(&mut s).await;

        assert_eq!(summary.rounds, MAX_INFORMATION_ROUNDS);
        assert_eq!(summary.stop, StopCause::RoundCeiling);
        assert_eq!(fixture.calls(), vec![1, 1, 1, 0]);
        assert!(s.slot(AgentKind::Docs).has_pending_query());
    }

    #[tokio::test]
    async fn test_disabled_agents_never_run() {
        let fixture = Fixture::new(["a", "b", "c", "d"]);
        let supervisor = ScriptedProvider::new(vec![route(
            r#"{"source_code": "1", "git": "2", "github": "3", "docs": "4"}"#,
        )]);
        let mut s = session(AgentToggles::only(AgentKind::Docs));

        let summary = fixture.orchestrator(supervisor).run(&mut s).await;

        assert_eq!(summary.dispatched, vec![AgentKind::Docs]);
        assert_eq!(fixture.calls(), vec![0, 0, 0, 1]);
        for kind in [AgentKind::SourceCode, AgentKind::Git, AgentKind::GitHub] {
            assert_eq!(s.response(kind), &AgentResponse::Declined);
            assert!(s.slot(kind).queries.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unparseable_supervisor_stops_after_first_route() {
        let fixture = Fixture::new(["a", "b", "c", "d"]);
        let supervisor = ScriptedProvider::new(vec![route("I think git should go next.")]);
        let mut s = session(AgentToggles::default());

        let summary = fixture.orchestrator(supervisor.clone()).run(&mut s).await;

        assert_eq!(summary.rounds, 0);
        assert_eq!(summary.stop, StopCause::NoPendingWork);
        assert_eq!(supervisor.calls(), 1);
        assert_eq!(fixture.calls(), vec![0, 0, 0, 0]);
        assert_eq!(s.supervisor_responses, vec!["{}"]);
    }

    #[tokio::test]
    async fn test_pass_reply_settles_declined() {
        let fixture = Fixture::new(["PASS", "b", "c", "d"]);
        let supervisor = ScriptedProvider::new(vec![
            route(r#"{"source_code": "classes"}"#),
            route(r#"{"source_code": "classes again"}"#),
        ]);
        let mut s = session(AgentToggles::default());

        let summary = fixture.orchestrator(supervisor).run(&mut s).await;

        assert_eq!(summary.rounds, 1);
        assert_eq!(s.response(AgentKind::SourceCode), &AgentResponse::Declined);
        assert_eq!(s.slot(AgentKind::SourceCode).queries, vec!["classes"]);
    }
}
