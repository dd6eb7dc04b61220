// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! repo-scout entry point - CLI, commands, and REPL.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::Level;

use repo_scout::config::{self, CliOptions, ResolvedConfig};
use repo_scout::response::NOT_ENOUGH_INFORMATION;
use repo_scout::telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
use repo_scout::{TurnReport, TurnRunner, VERSION};

/// repo-scout - ask questions about a repository.
#[derive(Parser)]
#[command(name = "scout")]
#[command(author, version, about = "Ask questions about a repository", long_about = None)]
struct Cli {
    /// Model provider (openai, anthropic, ollama, groq, openai-compatible)
    #[arg(short, long, global = true, env = "SCOUT_PROVIDER")]
    provider: Option<String>,

    /// Model to use for every role without an override
    #[arg(short, long, global = true, env = "SCOUT_MODEL")]
    model: Option<String>,

    /// Base URL for the model API
    #[arg(long, global = true, env = "SCOUT_BASE_URL")]
    base_url: Option<String>,

    #[command(flatten)]
    scope: ScopeArgs,

    /// Show info-level logs and a metrics report on exit
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Show debug output, including generated commands
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// What a turn may look at.
#[derive(Args, Debug, Clone, Default)]
struct ScopeArgs {
    /// Local git checkout
    #[arg(long, global = true, env = "SCOUT_REPOSITORY_PATH")]
    repo: Option<PathBuf>,

    /// GitHub repository (owner/name)
    #[arg(long, global = true, env = "SCOUT_GITHUB_REPO")]
    github: Option<String>,

    /// Documentation domain or local docs directory
    #[arg(long, global = true, env = "SCOUT_DOCS_SOURCE")]
    docs: Option<String>,

    /// SQLite store with the extracted source model
    #[arg(long, global = true, env = "SCOUT_SOURCE_DB")]
    db: Option<PathBuf>,

    /// Disable the source code agent
    #[arg(long, global = true)]
    no_source: bool,

    /// Disable the git agent
    #[arg(long, global = true)]
    no_git: bool,

    /// Disable the GitHub agent
    #[arg(long, global = true)]
    no_github: bool,

    /// Disable the documentation agent
    #[arg(long, global = true)]
    no_docs: bool,
}

/// Output format for `ask`.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and exit
    Ask {
        /// The question
        question: String,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Suppress the spinner and the turn summary
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Write an example .scout.json in the current directory
    Init,

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the merged configuration
    Show,
}

impl Cli {
    fn cli_options(&self) -> CliOptions {
        CliOptions {
            provider: self.provider.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            repository_path: self.scope.repo.clone(),
            github_repo: self.scope.github.clone(),
            docs_source: self.scope.docs.clone(),
            source_db: self.scope.db.clone(),
            no_source_code: self.scope.no_source,
            no_git: self.scope.no_git,
            no_github: self.scope.no_github,
            no_docs: self.scope.no_docs,
        }
    }

    fn telemetry(&self) -> TelemetryConfig {
        if self.debug {
            TelemetryConfig::development()
        } else if self.verbose {
            TelemetryConfig::default().with_level(Level::INFO)
        } else {
            TelemetryConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard: TelemetryGuard = init_telemetry(&cli.telemetry())?;

    let cwd = std::env::current_dir()?;
    let workspace_root = config::find_workspace_root(&cwd).unwrap_or(cwd);
    let options = cli.cli_options();

    match cli.command {
        Some(Commands::Ask {
            question,
            format,
            quiet,
        }) => {
            let config = config::load_config(&workspace_root, options)?;
            handle_ask(&config, &question, format, quiet).await
        }
        Some(Commands::Config { action }) => match action {
            Some(ConfigAction::Show) | None => {
                let config = config::load_config(&workspace_root, options)?;
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(())
            }
        },
        Some(Commands::Init) => {
            let path = config::init_config(&workspace_root, None)?;
            println!("Created config file: {}", path.display());
            Ok(())
        }
        Some(Commands::Version) => {
            println!("scout {VERSION}");
            Ok(())
        }
        None => {
            let config = config::load_config(&workspace_root, options)?;
            run_repl(&config).await
        }
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Run one turn behind a spinner.
async fn ask(runner: &TurnRunner, config: &ResolvedConfig, question: &str, context: Vec<String>, quiet: bool) -> TurnReport {
    let spinner = (!quiet).then(|| create_spinner("Gathering information..."));
    let report = runner.run(question, config.turn_config(), context).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    report
}

fn print_summary(report: &TurnReport) {
    let agents: Vec<&str> = report.dispatched.iter().map(|k| k.label()).collect();
    let agents = if agents.is_empty() {
        "none".to_string()
    } else {
        agents.join(", ")
    };
    let line = format!(
        "rounds: {} | agents: {} | repairs: {} | {} ms",
        report.rounds, agents, report.repairs, report.duration_ms
    );
    println!("{}", line.dimmed());
}

async fn handle_ask(config: &ResolvedConfig, question: &str, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    if config.agents.all_disabled() {
        tracing::warn!("Every agent is disabled; the answer will be empty");
    }
    let runner = TurnRunner::from_config(config)?;
    let quiet = quiet || matches!(format, OutputFormat::Json);
    let report = ask(&runner, config, question, Vec::new(), quiet).await;

    match format {
        OutputFormat::Text => {
            println!("{}", report.answer);
            if !quiet {
                print_summary(&report);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn history_path() -> Option<PathBuf> {
    config::get_global_config_dir().map(|dir| dir.join("history.txt"))
}

async fn run_repl(config: &ResolvedConfig) -> anyhow::Result<()> {
    let runner = TurnRunner::from_config(config)?;
    let mut editor = DefaultEditor::new()?;
    let history = history_path();
    if let Some(path) = &history {
        // Missing on first run.
        let _ = editor.load_history(path);
    }

    println!("{} {}", "scout".bright_cyan().bold(), VERSION.dimmed());
    println!("{}", "Ask a question about the repository. /help for commands.".dimmed());

    let mut context: Vec<String> = Vec::new();
    loop {
        let line = match editor.readline("scout> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        editor.add_history_entry(input)?;

        match input {
            "/exit" | "/quit" => break,
            "/clear" => {
                context.clear();
                println!("{}", "Context cleared.".dimmed());
                continue;
            }
            "/help" => {
                println!("/clear  forget earlier questions");
                println!("/exit   leave");
                continue;
            }
            _ => {}
        }

        let report = ask(&runner, config, input, context.clone(), false).await;
        println!("{}\n", report.answer.bright_white());
        print_summary(&report);

        if report.answer != NOT_ENOUGH_INFORMATION {
            context.push(format!("Q: {}\nA: {}", report.query, report.answer));
        }
    }

    if let Some(path) = &history {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if let Err(e) = editor.save_history(path) {
            tracing::warn!(error = %e, "Could not save history");
        }
    }
    Ok(())
}
