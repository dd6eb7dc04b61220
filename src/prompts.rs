// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! System and user prompts for every model role, plus helpers for rendering
//! session state into prompt text and cleaning model output.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::session::{AgentKind, AgentResponse, SessionState, AGENT_PRIORITY};

/// Answers longer than this are cut when shown to the supervisor.
pub const MAX_ROUTING_ANSWER_CHARS: usize = 2000;

const SHARED_PREAMBLE: &str = "\
You are one agent in a multi-agent system that helps users explore a large software \
codebase through conversation. Other agents may already have run: use all available \
context, answer precisely and avoid repeating what is already known.";

pub const SUPERVISOR_SYSTEM: &str = r#"You are the routing agent of a multi-agent system.

Given the user's question, the sub-queries already sent, the agents' responses so far and
any extra context, decide which agent should run next and write a self-contained
sub-query for it. You are called once per round, so route to one agent at a time and use
what earlier agents returned to refine the next sub-query.

Agents:
- source_code: structure of the code (classes, methods, interfaces, relationships, which
  files define what), backed by a SQL database extracted from the source.
- git: version-control history (commits, changed files, diffs, authorship, dates).
- github: hosting metadata (issues and pull requests).
- docs: project documentation, configuration and usage guides.

Rules:
- Sub-queries must not use references such as "this class" or "it"; resolve them from
  the context.
- Never send a sub-query that an agent has already received.
- Use "PASS" for every agent that should not run. When nothing more is needed, return
  "PASS" for all agents.
- Do not answer the question yourself.

Respond with one raw JSON object and nothing else:
{"source_code": "...", "git": "...", "github": "...", "docs": "..."}"#;

pub const SOURCE_SYSTEM: &str = "\
You are a SQL expert exploring a SQLite database that describes the structure of a \
software system. Tables include:
- uml_class: id, name, package, isAbstract, isInterface
- uml_property: class attributes with dataType, visibility, isStatic
- uml_method: returnType, parameters, visibility, isStatic, isAbstract
- uml_relationship: inheritance, association, composition and usage between classes

Write one minimal, correct SQLite query that answers the question and submit it with \
the provided tool. Do not explain the query.";

pub const GIT_SYSTEM: &str = "\
You analyze the history of a local git repository using only the provided tool. Derive \
every fact from git output, never from prior knowledge. Produce a single read-only git \
command (without the leading `git`), not a general shell command.";

pub const GITHUB_SYSTEM: &str = "\
You turn questions about a GitHub repository into a short search query over its issues \
and pull requests. Mention \"issue\" or \"pull request\" so the right search runs, and \
add focused keywords (for example \"issue label:bug authentication\"). Return plain \
text through the provided tool; never answer the question directly.";

pub const DOCS_SYSTEM: &str = "\
You answer questions using only the documentation content you are given. Do not use \
prior knowledge. If the content could not be loaded, say so plainly. If it does not \
cover the question, say that politely. Summarize clearly and concisely.";

pub const RESPONSE_SYSTEM: &str = "\
You write the final answer to a user's question about a large codebase. Other workers \
have already gathered raw information; your only task is to combine what they returned \
into a complete, precise answer. Do not gather anything yourself, do not ask follow-up \
questions, and do not mention the workers or the system you are part of. Some or all \
of the inputs may say they cannot answer. If the information is not enough, say that \
you do not have enough information to answer the question.";

/// System prompt for an information agent, with the shared preamble.
pub fn agent_system(kind: AgentKind) -> String {
    let body = match kind {
        AgentKind::SourceCode => SOURCE_SYSTEM,
        AgentKind::Git => GIT_SYSTEM,
        AgentKind::GitHub => GITHUB_SYSTEM,
        AgentKind::Docs => DOCS_SYSTEM,
    };
    format!("{SHARED_PREAMBLE}\n\n{body}")
}

/// Render context lines, or `None` when empty.
pub fn format_context(context: &[String]) -> String {
    if context.is_empty() {
        "None".to_string()
    } else {
        context.join("\n")
    }
}

/// Placeholder for an agent that has nothing to contribute.
pub fn not_applicable(label: &str) -> String {
    format!("{label}: PASS or not applicable")
}

/// The latest message, or [`not_applicable`] when there is none.
pub fn safe_content(messages: &[String], label: &str) -> String {
    match messages.last() {
        Some(text) => text.clone(),
        None => not_applicable(label),
    }
}

static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// Strip `<think>...</think>` reasoning blocks some models emit.
pub fn remove_think_blocks(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}

/// Cut `text` to `max_chars` characters, marking the cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n... [truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

fn routing_response(response: &AgentResponse) -> String {
    match response {
        AgentResponse::NotStarted => "not yet answered".to_string(),
        AgentResponse::Declined => "PASS".to_string(),
        AgentResponse::Answered(text) => truncate_text(text, MAX_ROUTING_ANSWER_CHARS),
    }
}

pub fn supervisor_user(session: &SessionState) -> String {
    let mut prompt = format!(
        "User query:\n{}\n\nContext:\n{}\n\nSub-queries already sent:\n",
        session.user_query_text(),
        format_context(&session.context)
    );
    for kind in AGENT_PRIORITY {
        let query = session.slot(kind).current_query().unwrap_or("none");
        prompt.push_str(&format!("- {}: {query}\n", kind.key()));
    }
    prompt.push_str("\nAgent responses so far:\n");
    for kind in AGENT_PRIORITY {
        prompt.push_str(&format!("- {}: {}\n", kind.key(), routing_response(session.response(kind))));
    }
    prompt.push_str(
        "\nWrite new sub-queries only where new information is needed, for one agent per \
         round, and \"PASS\" for the rest.",
    );
    prompt
}

pub fn source_user(query: &str, context: &[String]) -> String {
    format!("Question: {query}\n\nContext: {}", format_context(context))
}

pub fn git_user(query: &str, repository: &Path, context: &[String]) -> String {
    format!(
        "Git question:\n{query}\n\nRepository path: {}\n\nContext:\n{}",
        repository.display(),
        format_context(context)
    )
}

pub fn github_user(query: &str, repo: &str, context: &[String]) -> String {
    format!(
        "Question:\n{query}\n\nGitHub repository: {repo}\n\nContext:\n{}\n\n\
         Turn this into a search query for the repository's issues or pull requests.",
        format_context(context)
    )
}

pub fn docs_user(query: &str, context: &[String], documents: &str) -> String {
    format!(
        "Question:\n{query}\n\nContext:\n{}\n\nDocument content:\n{documents}\n\n\
         Answer using only the document content above.",
        format_context(context)
    )
}

/// Final-answer prompt. `responses` pairs each agent with its rendered text.
pub fn response_user(user_query: &str, context: &[String], responses: &[(AgentKind, String)]) -> String {
    let mut prompt = format!(
        "User question:\n{user_query}\n\nContext:\n{}\n\nGathered information:\n",
        format_context(context)
    );
    for (kind, text) in responses {
        let label = kind.label();
        if *text == not_applicable(label) {
            prompt.push_str(&format!("- {text}\n"));
        } else {
            prompt.push_str(&format!("- {label}: {text}\n"));
        }
    }
    prompt.push_str("\nWrite a helpful, clear answer below:");
    prompt
}

/// Repair prompt. `target` is prepended verbatim, e.g. `Repository: <path>\n\n`.
pub fn repair_user(target: &str, command: &str, failure: &str) -> String {
    format!("{target}Command:\n{command}\n\nError:\n{failure}\n\nReturn the corrected command.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TurnConfig;

    #[test]
    fn test_remove_think_blocks() {
        assert_eq!(
            remove_think_blocks("<think>route to git\nmaybe</think>{\"git\": \"log\"}"),
            "{\"git\": \"log\"}"
        );
        assert_eq!(remove_think_blocks("a<think>x</think>b<think>y</think>c"), "abc");
        assert_eq!(remove_think_blocks("no blocks"), "no blocks");
    }

    #[test]
    fn test_safe_content() {
        assert_eq!(
            safe_content(&["old".to_string(), "3 commits".to_string()], "Git"),
            "3 commits"
        );
        assert_eq!(safe_content(&[], "Git"), "Git: PASS or not applicable");
    }

    #[test]
    fn test_response_user_labels_each_slot_once() {
        let prompt = response_user(
            "Who changed Foo?",
            &[],
            &[
                (AgentKind::SourceCode, not_applicable(AgentKind::SourceCode.label())),
                (AgentKind::Git, "Ada".to_string()),
                (AgentKind::GitHub, safe_content(&[], AgentKind::GitHub.label())),
            ],
        );
        assert!(prompt.contains("- Source Code: PASS or not applicable\n"));
        assert!(prompt.contains("- Git: Ada\n"));
        assert!(prompt.contains("- GitHub: PASS or not applicable\n"));
        assert!(!prompt.contains("Source Code: Source Code"));
        assert!(!prompt.contains("GitHub: GitHub"));
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("ääääää", 2), "ää\n... [truncated]");
    }

    #[test]
    fn test_supervisor_user_renders_state() {
        let mut session = SessionState::new("Who changed Foo?", TurnConfig::default());
        session.push_query(AgentKind::SourceCode, "Where is Foo defined?");
        session.set_response(AgentKind::SourceCode, AgentResponse::Answered("[('Foo',)]".into()));
        session.set_response(AgentKind::GitHub, AgentResponse::Declined);

        let prompt = supervisor_user(&session);
        assert!(prompt.contains("Who changed Foo?"));
        assert!(prompt.contains("- source_code: Where is Foo defined?"));
        assert!(prompt.contains("- git: none"));
        assert!(prompt.contains("- source_code: [('Foo',)]"));
        assert!(prompt.contains("- git: not yet answered"));
        assert!(prompt.contains("- github: PASS"));
        assert!(prompt.contains("Context:\nNone"));
    }

    #[test]
    fn test_agent_system_has_preamble() {
        for kind in AGENT_PRIORITY {
            assert!(agent_system(kind).starts_with(SHARED_PREAMBLE));
        }
    }
}
