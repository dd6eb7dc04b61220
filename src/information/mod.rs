// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Information gathering: the supervisor routes sub-queries and the orchestrator
//! dispatches agents until nothing is left to ask.

pub mod orchestrator;
pub mod routing;
pub mod supervisor;

pub use orchestrator::{
    is_pending, next_pending, InformationOrchestrator, OrchestrationSummary, StopCause,
    MAX_INFORMATION_ROUNDS,
};
pub use routing::{Route, RoutingDecision};
pub use supervisor::{apply, Supervisor};
