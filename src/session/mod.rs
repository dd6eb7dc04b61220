// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-turn session state.
//!
//! A [`SessionState`] is created for each user question and passed by `&mut` through
//! the supervisor, the orchestrator and the synthesizer. Nothing outlives the turn
//! except what the caller copies out of it.

mod types;

pub use types::{
    is_pass, AgentKind, AgentResponse, AgentSlot, AgentToggles, TurnConfig, AGENT_PRIORITY, PASS,
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::telemetry::CorrelationId;

/// The mutable record of one turn.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub turn_id: CorrelationId,
    pub started_at: DateTime<Utc>,
    /// Append-only user messages for this turn.
    pub user_query: Vec<String>,
    /// Shared context, such as earlier exchanges in an interactive session.
    pub context: Vec<String>,
    source_code: AgentSlot,
    git: AgentSlot,
    github: AgentSlot,
    docs: AgentSlot,
    /// Parsed routing decisions, one per supervisor call.
    pub supervisor_responses: Vec<String>,
    rounds: u32,
    pub config: TurnConfig,
    pub final_response: Option<String>,
}

impl SessionState {
    pub fn new(query: impl Into<String>, config: TurnConfig) -> Self {
        Self {
            turn_id: CorrelationId::new(),
            started_at: Utc::now(),
            user_query: vec![query.into()],
            context: Vec::new(),
            source_code: AgentSlot::default(),
            git: AgentSlot::default(),
            github: AgentSlot::default(),
            docs: AgentSlot::default(),
            supervisor_responses: Vec::new(),
            rounds: 0,
            config,
            final_response: None,
        }
    }

    pub fn with_context(mut self, context: impl IntoIterator<Item = String>) -> Self {
        self.context.extend(context);
        self
    }

    pub fn slot(&self, kind: AgentKind) -> &AgentSlot {
        match kind {
            AgentKind::SourceCode => &self.source_code,
            AgentKind::Git => &self.git,
            AgentKind::GitHub => &self.github,
            AgentKind::Docs => &self.docs,
        }
    }

    pub(crate) fn slot_mut(&mut self, kind: AgentKind) -> &mut AgentSlot {
        match kind {
            AgentKind::SourceCode => &mut self.source_code,
            AgentKind::Git => &mut self.git,
            AgentKind::GitHub => &mut self.github,
            AgentKind::Docs => &mut self.docs,
        }
    }

    pub fn response(&self, kind: AgentKind) -> &AgentResponse {
        &self.slot(kind).response
    }

    /// Append a routed sub-query for an agent.
    pub(crate) fn push_query(&mut self, kind: AgentKind, query: impl Into<String>) {
        self.slot_mut(kind).queries.push(query.into());
    }

    pub(crate) fn set_response(&mut self, kind: AgentKind, response: AgentResponse) {
        self.slot_mut(kind).response = response;
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub(crate) fn increment_round(&mut self) {
        self.rounds += 1;
    }

    /// All user messages joined by newlines.
    pub fn user_query_text(&self) -> String {
        self.user_query.join("\n")
    }

    /// Whether any agent produced an answer.
    pub fn any_answered(&self) -> bool {
        AGENT_PRIORITY.iter().any(|k| self.response(*k).is_filled())
    }
}
