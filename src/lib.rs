// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! repo-scout - answers questions about a software repository.
//!
//! A supervisor model splits each question into sub-queries for four information
//! agents (source model, git history, GitHub issues and pull requests, documentation),
//! an orchestrator runs them one per round, and a response model writes the answer
//! from whatever they gathered.
//!
//! # Architecture
//!
//! - [`types`] - Messages, tool definitions and the [`Provider`] trait
//! - [`error`] - Error types and result aliases
//! - [`config`] - Configuration loading and merging
//! - [`providers`] - OpenAI-compatible and Anthropic providers, one per role
//! - [`telemetry`] - Tracing, metrics and correlation IDs
//! - [`backends`] - SQLite, git, GitHub and documentation adapters
//! - [`prompts`] - System and user prompts for every role
//! - [`session`] - Per-turn state shared by every component
//! - [`agents`] - The four information agents and the command repair loop
//! - [`information`] - Routing supervisor and orchestration loop
//! - [`response`] - Final answer synthesis
//! - [`turn`] - One question in, one [`TurnReport`] out
//!
//! # Example
//!
//! ```rust,ignore
//! use repo_scout::config::{load_config, CliOptions};
//! use repo_scout::turn::TurnRunner;
//!
//! let config = load_config(".".as_ref(), CliOptions::default())?;
//! let runner = TurnRunner::from_config(&config)?;
//! let report = runner.run("Who last changed the parser?", config.turn_config(), vec![]).await;
//! println!("{}", report.answer);
//! ```

pub mod agents;
pub mod backends;
pub mod config;
pub mod error;
pub mod information;
pub mod prompts;
pub mod providers;
pub mod response;
pub mod session;
pub mod telemetry;
pub mod turn;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{BackendError, ConfigError, ProviderError, Result};
pub use providers::{create_provider, AgentModels, AnthropicProvider, OpenAIProvider, ProviderType};
pub use session::{AgentKind, AgentResponse, AgentToggles, SessionState, TurnConfig};
pub use turn::{TurnReport, TurnRunner};
pub use types::{Message, Provider, ProviderConfig, ProviderResponse, SharedProvider, ToolDefinition};

/// repo-scout version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
