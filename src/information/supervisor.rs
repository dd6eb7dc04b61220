// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The routing supervisor: one model call per round.

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;
#[cfg(feature = "telemetry")]
use std::time::Instant;

use crate::prompts;
use crate::session::{AgentKind, AgentResponse, SessionState};
use crate::types::{Message, SharedProvider};

use super::routing::RoutingDecision;

pub struct Supervisor {
    model: SharedProvider,
}

impl Supervisor {
    pub fn new(model: SharedProvider) -> Self {
        Self { model }
    }

    /// Ask the model where to route next and record the decision in the session.
    pub async fn route(&self, session: &mut SessionState) -> RoutingDecision {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let messages = [Message::user(prompts::supervisor_user(session))];
        let decision = match self
            .model
            .chat(&messages, None, Some(prompts::SUPERVISOR_SYSTEM))
            .await
        {
            Ok(response) => {
                let text = prompts::remove_think_blocks(&response.content);
                let decision = RoutingDecision::parse(&text);
                if decision.is_empty() && !text.is_empty() {
                    tracing::warn!(output = %prompts::truncate_text(&text, 200), "Unparseable routing decision");
                }
                decision
            }
            Err(e) => {
                tracing::warn!(error = %e, "Supervisor call failed");
                RoutingDecision::empty()
            }
        };

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("supervisor.route", start.elapsed());

        let appended = apply(session, &decision);
        tracing::debug!(round = session.rounds(), routed = ?appended, "Routing applied");
        session.supervisor_responses.push(decision.to_json_string());
        decision
    }
}

/// Append each routed sub-query to an agent that has not run and was not already
/// given that exact sub-query. Returns the agents that received one.
pub fn apply(session: &mut SessionState, decision: &RoutingDecision) -> Vec<AgentKind> {
    let mut appended = Vec::new();
    for (kind, query) in decision.routed() {
        let slot = session.slot(kind);
        if slot.response != AgentResponse::NotStarted {
            continue;
        }
        if slot.current_query() == Some(query.as_str()) {
            continue;
        }
        session.push_query(kind, query);
        appended.push(kind);
    }
    appended
}
