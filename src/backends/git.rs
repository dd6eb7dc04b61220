// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Git subprocess runner.
//!
//! Commands come from a model, so they are split with `shlex` (never passed to a
//! shell) and limited to read-only subcommands.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

#[cfg(feature = "telemetry")]
use tracing::debug;

use crate::error::BackendError;
use crate::telemetry::BackendSpan;

use super::{truncate_output, VcsRunner};

/// Subcommands that never modify the repository.
pub const READ_ONLY_SUBCOMMANDS: &[&str] = &[
    "log",
    "show",
    "diff",
    "blame",
    "shortlog",
    "status",
    "branch",
    "tag",
    "ls-files",
    "ls-tree",
    "rev-parse",
    "rev-list",
    "describe",
    "grep",
    "cat-file",
    "for-each-ref",
    "reflog",
    "show-ref",
    "whatchanged",
    "name-rev",
    "merge-base",
    "count-objects",
];

/// Arguments that turn a listing subcommand into a write.
fn write_flags(subcommand: &str) -> &'static [&'static str] {
    match subcommand {
        "branch" => &[
            "-d", "-D", "--delete", "-m", "-M", "--move", "-c", "-C", "--copy", "-f", "--force",
            "-u", "--set-upstream-to", "--unset-upstream", "--edit-description",
        ],
        "tag" => &[
            "-d", "--delete", "-a", "--annotate", "-s", "--sign", "-u", "-f", "--force", "-m", "-F",
        ],
        "reflog" => &["expire", "delete"],
        _ => &[],
    }
}

/// Options that make git start another program.
fn exec_flags(subcommand: &str) -> &'static [&'static str] {
    match subcommand {
        "grep" => &["-O", "--open-files-in-pager", "--ext-grep", "--textconv"],
        "diff" | "log" | "show" | "whatchanged" => &["--ext-diff", "--textconv"],
        "blame" | "cat-file" => &["--textconv"],
        _ => &[],
    }
}

/// Whether `arg` sets `flag` in any spelling git's option parser accepts.
/// Long flags may be abbreviated (`--open`) or carry `=value`. Short flags may be
/// bundled (`-nOvim`).
fn sets_flag(arg: &str, flag: &str) -> bool {
    if let Some(long) = flag.strip_prefix("--") {
        let Some(given) = arg.strip_prefix("--") else {
            return false;
        };
        let name = given.split('=').next().unwrap_or(given);
        !name.is_empty() && long.starts_with(name)
    } else if let Some(short) = flag.strip_prefix('-') {
        match arg.strip_prefix('-') {
            Some(cluster) if !cluster.starts_with('-') => cluster.contains(short),
            _ => false,
        }
    } else {
        arg == flag
    }
}

/// Subcommands whose bare invocation lists, but which create objects when given a name.
const LISTING_SUBCOMMANDS: &[&str] = &["branch", "tag"];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Output beyond this many lines is elided in the middle.
pub const MAX_OUTPUT_LINES: usize = 500;

#[derive(Debug, Clone)]
pub struct GitRunner {
    binary: String,
    timeout: Duration,
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl GitRunner {
    pub fn new() -> Self {
        Self {
            binary: "git".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Split a model-written command into git arguments, enforcing the read-only policy.
pub fn parse_command(command: &str) -> Result<Vec<String>, BackendError> {
    let mut args = shlex::split(command.trim())
        .ok_or_else(|| BackendError::CommandFailed(format!("could not parse command: {command}")))?;

    if args.first().is_some_and(|a| a == "git") {
        args.remove(0);
    }

    let Some(subcommand) = args.first() else {
        return Err(BackendError::CommandFailed("empty git command".to_string()));
    };

    if !READ_ONLY_SUBCOMMANDS.contains(&subcommand.as_str()) {
        return Err(BackendError::CommandFailed(format!(
            "'{subcommand}' is not a permitted read-only git subcommand; use one of: {}",
            READ_ONLY_SUBCOMMANDS.join(", ")
        )));
    }

    let rest = &args[1..];
    if let Some(flag) = rest.iter().find(|a| a.starts_with("--output")) {
        return Err(BackendError::CommandFailed(format!("'{flag}' is not permitted")));
    }

    let runs_program = exec_flags(subcommand);
    if let Some(flag) = rest.iter().find(|a| runs_program.iter().any(|f| sets_flag(a, f))) {
        return Err(BackendError::CommandFailed(format!(
            "'{subcommand} {flag}' would run an external program"
        )));
    }

    let forbidden = write_flags(subcommand);
    if let Some(flag) = rest.iter().find(|a| forbidden.iter().any(|f| sets_flag(a, f))) {
        return Err(BackendError::CommandFailed(format!(
            "'{subcommand} {flag}' would modify the repository"
        )));
    }

    if LISTING_SUBCOMMANDS.contains(&subcommand.as_str()) {
        let lists = rest.is_empty() || rest.iter().any(|a| a.starts_with('-'));
        if !lists {
            return Err(BackendError::CommandFailed(format!(
                "'{subcommand}' with a name creates a ref; add --list to list instead"
            )));
        }
    }

    Ok(args)
}

#[async_trait]
impl VcsRunner for GitRunner {
    async fn run(&self, workdir: &Path, command: &str) -> Result<String, BackendError> {
        if !workdir.join(".git").exists() {
            return Err(BackendError::NotARepository(workdir.display().to_string()));
        }

        let args = parse_command(command)?;

        #[cfg(feature = "telemetry")]
        debug!(workdir = %workdir.display(), args = ?args, "Running git");

        let span = BackendSpan::start("git");
        let result = self.spawn(workdir, &args).await;
        span.finish_with_result(&result);
        result
    }
}

impl GitRunner {
    async fn spawn(&self, workdir: &Path, args: &[String]) -> Result<String, BackendError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_PAGER", "cat")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BackendError::CommandFailed(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                format!("git exited with {}", output.status)
            } else {
                stderr
            };
            return Err(BackendError::CommandFailed(detail));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(truncate_output(stdout.trim(), MAX_OUTPUT_LINES))
    }
}
