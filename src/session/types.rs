// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-agent state carried through a turn.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Literal an agent or the supervisor uses to decline.
pub const PASS: &str = "PASS";

/// Whether `text` is the PASS sentinel (trimmed, any case).
pub fn is_pass(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(PASS)
}

/// The four information agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    SourceCode,
    Git,
    GitHub,
    Docs,
}

/// Dispatch order: when several agents are pending, the first one here runs.
pub const AGENT_PRIORITY: [AgentKind; 4] = [
    AgentKind::SourceCode,
    AgentKind::Git,
    AgentKind::GitHub,
    AgentKind::Docs,
];

impl AgentKind {
    /// Key used in routing decisions and reports.
    pub fn key(&self) -> &'static str {
        match self {
            Self::SourceCode => "source_code",
            Self::Git => "git",
            Self::GitHub => "github",
            Self::Docs => "docs",
        }
    }

    /// Human-readable label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SourceCode => "Source Code",
            Self::Git => "Git",
            Self::GitHub => "GitHub",
            Self::Docs => "Documentation",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        AGENT_PRIORITY.into_iter().find(|k| k.key() == key)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Outcome of an agent for the current turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum AgentResponse {
    /// Not dispatched yet.
    #[default]
    NotStarted,
    /// Disabled, declined with PASS, or produced nothing.
    Declined,
    Answered(String),
}

impl AgentResponse {
    /// Settle an agent's raw output. PASS and blank text decline.
    pub fn settle(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() || is_pass(&text) {
            Self::Declined
        } else {
            Self::Answered(text)
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Answered(_))
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::NotStarted)
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Answered(text) => Some(text),
            _ => None,
        }
    }
}

/// Queries routed to one agent and its response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSlot {
    /// Append-only; the last element is the current sub-query.
    pub queries: Vec<String>,
    pub response: AgentResponse,
}

impl AgentSlot {
    pub fn current_query(&self) -> Option<&str> {
        self.queries.last().map(String::as_str)
    }

    /// A non-empty, non-PASS sub-query is waiting and the agent has not run.
    pub fn has_pending_query(&self) -> bool {
        !self.response.is_settled()
            && self
                .current_query()
                .is_some_and(|q| !q.trim().is_empty() && !is_pass(q))
    }
}

/// Which agents may run in a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentToggles {
    pub source_code: bool,
    pub git: bool,
    pub github: bool,
    pub docs: bool,
}

impl Default for AgentToggles {
    fn default() -> Self {
        Self {
            source_code: true,
            git: true,
            github: true,
            docs: true,
        }
    }
}

impl AgentToggles {
    pub fn none() -> Self {
        Self {
            source_code: false,
            git: false,
            github: false,
            docs: false,
        }
    }

    /// Only `kind` enabled.
    pub fn only(kind: AgentKind) -> Self {
        let mut toggles = Self::none();
        toggles.set(kind, true);
        toggles
    }

    pub fn is_enabled(&self, kind: AgentKind) -> bool {
        match kind {
            AgentKind::SourceCode => self.source_code,
            AgentKind::Git => self.git,
            AgentKind::GitHub => self.github,
            AgentKind::Docs => self.docs,
        }
    }

    pub fn set(&mut self, kind: AgentKind, enabled: bool) {
        match kind {
            AgentKind::SourceCode => self.source_code = enabled,
            AgentKind::Git => self.git = enabled,
            AgentKind::GitHub => self.github = enabled,
            AgentKind::Docs => self.docs = enabled,
        }
    }

    pub fn all_disabled(&self) -> bool {
        AGENT_PRIORITY.iter().all(|k| !self.is_enabled(*k))
    }
}

/// Inputs fixed for the duration of a turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Working directory for the VCS agent.
    pub repository_path: Option<PathBuf>,
    /// `owner/name` on the hosting service.
    pub github_repo: Option<String>,
    /// Docs site domain, URL, or local directory.
    pub docs_source: Option<String>,
    /// SQLite store for the source agent.
    pub source_db: Option<PathBuf>,
    pub toggles: AgentToggles,
}
