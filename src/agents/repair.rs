// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Generate, execute, check, repair.
//!
//! The source and git agents share this loop. A model writes a command through a
//! single tool, the command runs, and if the result looks like a failure the model
//! gets one chance to fix it:
//!
//! ```text
//! generate -> execute -> check -+-> finalize
//!                 ^             |
//!                 +-- repair <--+   (at most MAX_REPAIR_ATTEMPTS times)
//! ```
//!
//! Nothing here returns an error. Model failures fall back to a harmless default
//! command, and backend failures are already text by the time they reach the check.

use async_trait::async_trait;
use serde_json::json;

use crate::prompts;
use crate::types::{InputSchema, Message, ProviderResponse, SharedProvider, ToolDefinition};

/// Repairs attempted after a failed execution.
pub const MAX_REPAIR_ATTEMPTS: u32 = 1;

/// What a command-writing agent looks like to the loop.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub tool_name: &'static str,
    pub tool_description: &'static str,
    /// Tool argument carrying the command.
    pub argument: &'static str,
    pub argument_description: &'static str,
    /// Used when the model fails or returns no usable command.
    pub fallback: &'static str,
    pub repair_system: &'static str,
    /// A result starting with any of these is a failure.
    pub failure_prefixes: &'static [&'static str],
}

pub const SQL_SPEC: CommandSpec = CommandSpec {
    tool_name: "GeneratedQuery",
    tool_description: "Submit the SQLite query to execute.",
    argument: "sql",
    argument_description: "The SQL query to execute.",
    fallback: "SELECT 1",
    repair_system: "You are a SQL expert. Fix the SQL query below based on the error message.",
    failure_prefixes: &["Error:"],
};

pub const GIT_SPEC: CommandSpec = CommandSpec {
    tool_name: "GitCommand",
    tool_description: "Submit the git command to run.",
    argument: "command",
    argument_description: "The git command to run (excluding 'git').",
    fallback: "log -1",
    repair_system: "You are a Git expert. Fix the git command below based on the error message.",
    failure_prefixes: &["Error:", "Error "],
};

impl CommandSpec {
    pub fn tool(&self) -> ToolDefinition {
        ToolDefinition::new(self.tool_name, self.tool_description).with_schema(
            InputSchema::new()
                .with_property(
                    self.argument,
                    json!({"type": "string", "description": self.argument_description}),
                )
                .with_required(vec![self.argument.to_string()]),
        )
    }

    /// First matching tool call with a non-empty string argument.
    pub fn extract(&self, response: &ProviderResponse) -> Option<String> {
        response
            .tool_calls
            .iter()
            .filter(|call| call.name == self.tool_name)
            .find_map(|call| call.string_arg(self.argument))
            .map(str::to_string)
    }

    pub fn is_failure(&self, result: &str) -> bool {
        self.failure_prefixes.iter().any(|p| result.starts_with(p))
    }
}

/// Result of running a command against a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Completed(String),
    /// A precondition failed; no command could succeed.
    Rejected(String),
}

/// Runs commands for the loop and renders their outcome as text.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &str) -> Execution;

    /// Prefix for the repair prompt, such as the repository being queried.
    fn repair_target(&self) -> String {
        String::new()
    }
}

/// Final state of one loop run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    /// Last command executed.
    pub command: String,
    /// Last execution result; this is the agent's answer.
    pub result: String,
    pub repairs: u32,
    /// The backend refused before running anything.
    pub rejected: bool,
}

pub struct RepairLoop<'a> {
    spec: &'a CommandSpec,
    model: &'a SharedProvider,
    executor: &'a dyn CommandExecutor,
}

impl<'a> RepairLoop<'a> {
    pub fn new(spec: &'a CommandSpec, model: &'a SharedProvider, executor: &'a dyn CommandExecutor) -> Self {
        Self { spec, model, executor }
    }

    pub async fn run(&self, system_prompt: &str, user_prompt: &str) -> RepairOutcome {
        let mut command = self.request_command(system_prompt, user_prompt).await;
        let mut repairs = 0;

        loop {
            tracing::debug!(tool = self.spec.tool_name, command = %command, "Executing generated command");

            let result = match self.executor.execute(&command).await {
                Execution::Rejected(text) => {
                    return RepairOutcome {
                        command,
                        result: text,
                        repairs,
                        rejected: true,
                    };
                }
                Execution::Completed(text) => text,
            };

            if !self.spec.is_failure(&result) || repairs >= MAX_REPAIR_ATTEMPTS {
                return RepairOutcome {
                    command,
                    result,
                    repairs,
                    rejected: false,
                };
            }

            repairs += 1;
            tracing::info!(tool = self.spec.tool_name, failed = %command, "Repairing command");
            let prompt = prompts::repair_user(&self.executor.repair_target(), &command, &result);
            command = self.request_command(self.spec.repair_system, &prompt).await;
        }
    }

    async fn request_command(&self, system_prompt: &str, user_prompt: &str) -> String {
        let tools = [self.spec.tool()];
        let messages = [Message::user(user_prompt)];
        match self.model.chat(&messages, Some(&tools), Some(system_prompt)).await {
            Ok(response) => self.spec.extract(&response).unwrap_or_else(|| {
                tracing::warn!(
                    tool = self.spec.tool_name,
                    fallback = self.spec.fallback,
                    "Model returned no command, using fallback"
                );
                self.spec.fallback.to_string()
            }),
            Err(e) => {
                tracing::warn!(
                    tool = self.spec.tool_name,
                    error = %e,
                    fallback = self.spec.fallback,
                    "Model call failed, using fallback"
                );
                self.spec.fallback.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedProvider;
    use std::sync::Mutex;

    /// Returns queued results and records the commands it was given.
    struct QueuedExecutor {
        results: Mutex<Vec<Execution>>,
        seen: Mutex<Vec<String>>,
    }

    impl QueuedExecutor {
        fn new(results: Vec<Execution>) -> Self {
            Self {
                results: Mutex::new(results.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandExecutor for QueuedExecutor {
        async fn execute(&self, command: &str) -> Execution {
            self.seen.lock().unwrap().push(command.to_string());
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Execution::Completed("Error: exhausted".to_string()))
        }

        fn repair_target(&self) -> String {
            "Repository: /repo\n\n".to_string()
        }
    }

    fn git_call(command: &str) -> ProviderResponse {
        ProviderResponse::tool_call("GitCommand", json!({ "command": command }))
    }

    #[tokio::test]
    async fn test_success_without_repair() {
        let model = ScriptedProvider::new(vec![git_call("log -3")]).shared();
        let exec = QueuedExecutor::new(vec![Execution::Completed("abc fix".to_string())]);

        let outcome = RepairLoop::new(&GIT_SPEC, &model, &exec).run("sys", "user").await;
        assert_eq!(outcome.result, "abc fix");
        assert_eq!(outcome.repairs, 0);
        assert_eq!(exec.seen(), vec!["log -3"]);
    }

    #[tokio::test]
    async fn test_single_repair_then_success() {
        let provider = ScriptedProvider::new(vec![git_call("lg -3"), git_call("log -3")]);
        let model = provider.clone().shared();
        let exec = QueuedExecutor::new(vec![
            Execution::Completed("Error running git command: 'lg' is not a git command".to_string()),
            Execution::Completed("abc fix".to_string()),
        ]);

        let outcome = RepairLoop::new(&GIT_SPEC, &model, &exec).run("sys", "user").await;
        assert_eq!(outcome.result, "abc fix");
        assert_eq!(outcome.command, "log -3");
        assert_eq!(outcome.repairs, 1);
        assert_eq!(provider.calls(), 2);

        let repair = provider.last_request().unwrap();
        assert_eq!(repair.system.as_deref(), Some(GIT_SPEC.repair_system));
        assert!(repair.user.starts_with("Repository: /repo\n\nCommand:\nlg -3"));
    }

    #[tokio::test]
    async fn test_second_failure_is_final() {
        let model = ScriptedProvider::new(vec![git_call("a"), git_call("b")]).shared();
        let exec = QueuedExecutor::new(vec![
            Execution::Completed("Error: first".to_string()),
            Execution::Completed("Error: second".to_string()),
        ]);

        let outcome = RepairLoop::new(&GIT_SPEC, &model, &exec).run("sys", "user").await;
        assert_eq!(outcome.result, "Error: second");
        assert_eq!(outcome.repairs, MAX_REPAIR_ATTEMPTS);
        assert_eq!(exec.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_skips_repair() {
        let provider = ScriptedProvider::new(vec![git_call("log")]);
        let model = provider.clone().shared();
        let exec = QueuedExecutor::new(vec![Execution::Rejected(
            "Error: /tmp is not a valid repository.".to_string(),
        )]);

        let outcome = RepairLoop::new(&GIT_SPEC, &model, &exec).run("sys", "user").await;
        assert!(outcome.rejected);
        assert_eq!(outcome.repairs, 0);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_on_missing_tool_call_and_model_error() {
        let model = ScriptedProvider::new(vec![ProviderResponse::text("SELECT name FROM x")])
            .then_fail()
            .shared();
        let exec = QueuedExecutor::new(vec![
            Execution::Completed("Error: no such table".to_string()),
            Execution::Completed("[(1,)]".to_string()),
        ]);

        let outcome = RepairLoop::new(&SQL_SPEC, &model, &exec).run("sys", "user").await;
        assert_eq!(exec.seen(), vec!["SELECT 1", "SELECT 1"]);
        assert_eq!(outcome.result, "[(1,)]");
    }

    #[test]
    fn test_extract_ignores_blank_and_other_tools() {
        let mut response = ProviderResponse::tool_call("Other", json!({"sql": "SELECT 2"}));
        response.tool_calls.push(crate::types::ToolCall {
            id: "1".to_string(),
            name: "GeneratedQuery".to_string(),
            input: json!({"sql": "  "}),
        });
        response.tool_calls.push(crate::types::ToolCall {
            id: "2".to_string(),
            name: "GeneratedQuery".to_string(),
            input: json!({"sql": "SELECT 3"}),
        });
        assert_eq!(SQL_SPEC.extract(&response).as_deref(), Some("SELECT 3"));
        assert_eq!(SQL_SPEC.extract(&ProviderResponse::empty()), None);
    }

    #[test]
    fn test_failure_prefixes() {
        assert!(GIT_SPEC.is_failure("Error running git command: fatal"));
        assert!(GIT_SPEC.is_failure("Error: /x is not a valid repository."));
        assert!(!SQL_SPEC.is_failure("Error running"));
        assert!(!SQL_SPEC.is_failure("[('Error:',)]"));
    }
}
