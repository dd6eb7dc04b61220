// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Final answer synthesis.
//!
//! The four agent responses are normalized into message sequences, the source
//! agent's row dump is turned into a readable list, and one model call writes the
//! answer. When no agent answered, the model is not called at all.

pub mod literal;

use std::cmp::Ordering;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;
#[cfg(feature = "telemetry")]
use std::time::Instant;

use crate::prompts;
use crate::session::{AgentKind, AgentResponse, SessionState, AGENT_PRIORITY};
use crate::types::{Message, SharedProvider};

use literal::PyValue;

/// Answer used when nothing useful was gathered.
pub const NOT_ENOUGH_INFORMATION: &str =
    "There is not enough information available to answer this question.";

pub const SOURCE_HEADER: &str = "The following classes or entities were found:";

/// Prefix for a source response that is not a row list.
pub const SOURCE_PARSE_FAILURE: &str = "(⚠️ Couldn't parse source response.)";

/// A slot as a message sequence: empty unless answered.
pub fn messages(response: &AgentResponse) -> Vec<String> {
    match response {
        AgentResponse::Answered(text) => vec![text.clone()],
        AgentResponse::NotStarted | AgentResponse::Declined => Vec::new(),
    }
}

/// First column of each row, deduplicated and sorted.
///
/// Fails wherever Python would raise: input that is not a literal, rows that are
/// empty tuples, unhashable names, or names that cannot be ordered together.
fn entity_names(raw: &str) -> Option<Vec<PyValue>> {
    let parsed = literal::parse(raw).ok()?;
    let items: Vec<&PyValue> = match &parsed {
        PyValue::Str(_) | PyValue::Bytes(_) => Vec::new(),
        other => other.iter_items()?.collect(),
    };

    let mut names: Vec<PyValue> = Vec::new();
    for item in items {
        let PyValue::Tuple(row) = item else {
            continue;
        };
        let first = row.first()?;
        if !first.is_hashable() {
            return None;
        }
        let seen = names
            .iter()
            .any(|n| n == first || n.py_cmp(first) == Some(Ordering::Equal));
        if !seen {
            names.push(first.clone());
        }
    }

    let mut comparable = true;
    names.sort_by(|a, b| {
        a.py_cmp(b).unwrap_or_else(|| {
            comparable = false;
            Ordering::Equal
        })
    });
    comparable.then_some(names)
}

/// Render a source agent answer as an entity list, or keep it behind a marker.
pub fn format_source_response(raw: &str) -> String {
    match entity_names(raw) {
        Some(names) => {
            let lines: Vec<String> = names.iter().map(|n| format!("- {n}")).collect();
            format!("{SOURCE_HEADER}\n{}", lines.join("\n"))
        }
        None => format!("{SOURCE_PARSE_FAILURE}\n\n{raw}"),
    }
}

/// Each agent's response as it appears in the final prompt.
pub fn rendered_responses(session: &SessionState) -> Vec<(AgentKind, String)> {
    AGENT_PRIORITY
        .into_iter()
        .map(|kind| {
            let mut sequence = messages(session.response(kind));
            if kind == AgentKind::SourceCode {
                sequence = sequence.iter().map(|m| format_source_response(m)).collect();
            }
            (kind, prompts::safe_content(&sequence, kind.label()))
        })
        .collect()
}

pub struct ResponseSynthesizer {
    model: SharedProvider,
}

impl ResponseSynthesizer {
    pub fn new(model: SharedProvider) -> Self {
        Self { model }
    }

    /// Write the final answer into the session and return it. Never fails.
    pub async fn synthesize(&self, session: &mut SessionState) -> String {
        let answer = if session.any_answered() {
            self.compose(session).await
        } else {
            tracing::info!("No agent answered, skipping synthesis");
            NOT_ENOUGH_INFORMATION.to_string()
        };
        session.final_response = Some(answer.clone());
        answer
    }

    async fn compose(&self, session: &SessionState) -> String {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let prompt = prompts::response_user(
            &session.user_query_text(),
            &session.context,
            &rendered_responses(session),
        );
        let result = self
            .model
            .chat(&[Message::user(prompt)], None, Some(prompts::RESPONSE_SYSTEM))
            .await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("response.synthesize", start.elapsed());

        match result {
            Ok(response) => {
                let text = prompts::remove_think_blocks(&response.content);
                if text.is_empty() {
                    tracing::warn!("Synthesizer returned empty text");
                    NOT_ENOUGH_INFORMATION.to_string()
                } else {
                    text
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Synthesizer call failed");
                NOT_ENOUGH_INFORMATION.to_string()
            }
        }
    }
}
