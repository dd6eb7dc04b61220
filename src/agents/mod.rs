// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Information agents.
//!
//! Each agent answers one routed sub-query using one backend and one model:
//!
//! - [`SourceAgent`]: SQL over the structured source store, with repair
//! - [`GitAgent`]: read-only git commands, with repair
//! - [`GitHubAgent`]: issue and pull-request search
//! - [`DocsAgent`]: documentation retrieval and summary
//!
//! Agents never fail. Every backend or model error becomes answer text, so the
//! orchestrator can always settle the agent's slot with whatever comes back.

pub mod docs;
pub mod git;
pub mod github;
pub mod repair;
pub mod source;

pub use docs::{DocsAgent, NO_SUMMARY};
pub use git::GitAgent;
pub use github::GitHubAgent;
pub use repair::{CommandExecutor, CommandSpec, Execution, RepairLoop, RepairOutcome, MAX_REPAIR_ATTEMPTS};
pub use source::SourceAgent;

use async_trait::async_trait;
use std::sync::Arc;

use crate::backends::Backends;
use crate::providers::AgentModels;
use crate::session::{AgentKind, TurnConfig};

/// Everything an agent sees for one dispatch.
#[derive(Debug, Clone, Copy)]
pub struct AgentRequest<'a> {
    pub query: &'a str,
    pub context: &'a [String],
    pub config: &'a TurnConfig,
}

/// An agent's answer text and how many repairs it took.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentOutput {
    pub text: String,
    pub repairs: u32,
}

impl AgentOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            repairs: 0,
        }
    }
}

impl From<RepairOutcome> for AgentOutput {
    fn from(outcome: RepairOutcome) -> Self {
        Self {
            text: outcome.result,
            repairs: outcome.repairs,
        }
    }
}

#[async_trait]
pub trait InformationAgent: Send + Sync {
    fn kind(&self) -> AgentKind;

    async fn answer(&self, request: AgentRequest<'_>) -> AgentOutput;
}

/// The four agents, addressable by kind.
#[derive(Clone)]
pub struct AgentSet {
    source_code: Arc<dyn InformationAgent>,
    git: Arc<dyn InformationAgent>,
    github: Arc<dyn InformationAgent>,
    docs: Arc<dyn InformationAgent>,
}

impl AgentSet {
    pub fn new(
        source_code: Arc<dyn InformationAgent>,
        git: Arc<dyn InformationAgent>,
        github: Arc<dyn InformationAgent>,
        docs: Arc<dyn InformationAgent>,
    ) -> Self {
        Self {
            source_code,
            git,
            github,
            docs,
        }
    }

    /// Standard agents over the given models and backends.
    pub fn build(models: &AgentModels, backends: &Backends) -> Self {
        Self::new(
            Arc::new(SourceAgent::new(Arc::clone(&models.source_code), Arc::clone(&backends.query))),
            Arc::new(GitAgent::new(Arc::clone(&models.git), Arc::clone(&backends.vcs))),
            Arc::new(GitHubAgent::new(Arc::clone(&models.github), Arc::clone(&backends.metadata))),
            Arc::new(DocsAgent::new(Arc::clone(&models.docs), Arc::clone(&backends.docs))),
        )
    }

    pub fn get(&self, kind: AgentKind) -> &Arc<dyn InformationAgent> {
        match kind {
            AgentKind::SourceCode => &self.source_code,
            AgentKind::Git => &self.git,
            AgentKind::GitHub => &self.github,
            AgentKind::Docs => &self.docs,
        }
    }
}
