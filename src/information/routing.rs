// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Routing decisions parsed from supervisor output.
//!
//! Parsing is total: whatever the model returns, the result is a decision, possibly
//! an empty one that routes nowhere.

use serde_json::{Map, Value};

use crate::session::{is_pass, AgentKind, AGENT_PRIORITY};

/// Where the supervisor sends one agent this round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    SubQuery(String),
    Pass,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingDecision {
    raw: Map<String, Value>,
}

impl RoutingDecision {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse model text into a decision.
    ///
    /// The first JSON value starting at the first `{` is used, or at an earlier `[`
    /// when the object is wrapped in a list. Text after the value is ignored.
    pub fn parse(text: &str) -> Self {
        let Some(brace) = text.find('{') else {
            return Self::empty();
        };
        let start = match text[..brace].find('[') {
            Some(bracket) => bracket,
            None => brace,
        };

        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        let raw = match values.next() {
            Some(Ok(Value::Object(map))) => map,
            Some(Ok(Value::Array(items))) => match items.into_iter().next() {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            },
            _ => Map::new(),
        };
        Self { raw }
    }

    /// A string value that is neither blank nor PASS routes a sub-query. Missing keys
    /// and non-string values pass.
    pub fn route(&self, kind: AgentKind) -> Route {
        match self.raw.get(kind.key()) {
            Some(Value::String(query)) if !query.trim().is_empty() && !is_pass(query) => {
                Route::SubQuery(query.trim().to_string())
            }
            _ => Route::Pass,
        }
    }

    /// Agents with a sub-query, in priority order.
    pub fn routed(&self) -> Vec<(AgentKind, String)> {
        AGENT_PRIORITY
            .into_iter()
            .filter_map(|kind| match self.route(kind) {
                Route::SubQuery(query) => Some((kind, query)),
                Route::Pass => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Compact JSON for the audit trail; `{}` when empty.
    pub fn to_json_string(&self) -> String {
        Value::Object(self.raw.clone()).to_string()
    }
}
