// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Git agent: answers history questions by running read-only git commands.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;
#[cfg(feature = "telemetry")]
use std::time::Instant;

use crate::backends::VcsRunner;
use crate::error::BackendError;
use crate::prompts;
use crate::session::AgentKind;
use crate::types::SharedProvider;

use super::repair::{CommandExecutor, Execution, RepairLoop, GIT_SPEC};
use super::{AgentOutput, AgentRequest, InformationAgent};

pub struct GitAgent {
    model: SharedProvider,
    runner: Arc<dyn VcsRunner>,
}

impl GitAgent {
    pub fn new(model: SharedProvider, runner: Arc<dyn VcsRunner>) -> Self {
        Self { model, runner }
    }
}

struct RepositoryCommands<'a> {
    runner: &'a dyn VcsRunner,
    workdir: &'a Path,
}

#[async_trait]
impl CommandExecutor for RepositoryCommands<'_> {
    async fn execute(&self, command: &str) -> Execution {
        match self.runner.run(self.workdir, command).await {
            Ok(stdout) => Execution::Completed(stdout),
            Err(e @ BackendError::NotARepository(_)) => Execution::Rejected(format!("Error: {e}")),
            Err(e) => Execution::Completed(format!("Error running git command: {e}")),
        }
    }

    fn repair_target(&self) -> String {
        format!("Repository: {}\n\n", self.workdir.display())
    }
}

#[async_trait]
impl InformationAgent for GitAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Git
    }

    async fn answer(&self, request: AgentRequest<'_>) -> AgentOutput {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        // No configured path means the current directory.
        let workdir = request
            .config
            .repository_path
            .as_deref()
            .unwrap_or(Path::new("."));

        let commands = RepositoryCommands {
            runner: self.runner.as_ref(),
            workdir,
        };
        let outcome = RepairLoop::new(&GIT_SPEC, &self.model, &commands)
            .run(
                &prompts::agent_system(AgentKind::Git),
                &prompts::git_user(request.query, workdir, request.context),
            )
            .await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("agent.git", start.elapsed());

        outcome.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedProvider;
    use crate::backends::MockVcsRunner;
    use crate::session::TurnConfig;
    use crate::types::ProviderResponse;
    use serde_json::json;
    use std::path::PathBuf;

    fn git(command: &str) -> ProviderResponse {
        ProviderResponse::tool_call("GitCommand", json!({ "command": command }))
    }

    fn config(path: &str) -> TurnConfig {
        TurnConfig {
            repository_path: Some(PathBuf::from(path)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fails_once_then_succeeds() {
        let provider = ScriptedProvider::new(vec![git("lgo -1"), git("log -1 --format=%an")]);
        let mut runner = MockVcsRunner::new();
        runner
            .expect_run()
            .withf(|_, command| command == "lgo -1")
            .times(1)
            .returning(|_, _| Err(BackendError::CommandFailed("git: 'lgo' is not a git command.".into())));
        runner
            .expect_run()
            .withf(|_, command| command == "log -1 --format=%an")
            .times(1)
            .returning(|_, _| Ok("Ada".to_string()));

        let agent = GitAgent::new(provider.clone().shared(), Arc::new(runner));
        let config = config("/work/repo");
        let out = agent
            .answer(AgentRequest {
                query: "Who made the last commit?",
                context: &[],
                config: &config,
            })
            .await;

        assert_eq!(out.text, "Ada");
        assert_eq!(out.repairs, 1);

        let repair = provider.last_request().unwrap();
        assert!(repair.user.starts_with("Repository: /work/repo\n\n"));
        assert!(repair
            .user
            .contains("Error running git command: git: 'lgo' is not a git command."));
    }

    #[tokio::test]
    async fn test_not_a_repository_is_final() {
        let provider = ScriptedProvider::new(vec![git("log -1")]);
        let mut runner = MockVcsRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|dir, _| Err(BackendError::NotARepository(dir.display().to_string())));

        let agent = GitAgent::new(provider.clone().shared(), Arc::new(runner));
        let config = config("/tmp/plain");
        let out = agent
            .answer(AgentRequest {
                query: "q",
                context: &[],
                config: &config,
            })
            .await;

        assert_eq!(out.text, "Error: /tmp/plain is not a valid repository.");
        assert_eq!(out.repairs, 0);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_defaults_to_current_directory() {
        let provider = ScriptedProvider::new(vec![git("status --short")]);
        let mut runner = MockVcsRunner::new();
        runner
            .expect_run()
            .withf(|dir, _| dir == Path::new("."))
            .times(1)
            .returning(|_, _| Ok(String::new()));

        let agent = GitAgent::new(provider.shared(), Arc::new(runner));
        let config = TurnConfig::default();
        let out = agent
            .answer(AgentRequest {
                query: "q",
                context: &[],
                config: &config,
            })
            .await;
        assert_eq!(out.text, "");
    }
}
