// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tracing setup, metrics, and correlation IDs.
//!
//! - **Tracing**: `tracing` spans per turn and per backend call, rendered by
//!   `tracing-subscriber` to stderr
//! - **Metrics**: backend call counts, model call latency, token usage and turn counters
//!   in [`GLOBAL_METRICS`]
//! - **Correlation IDs**: one per turn, recorded on the `turn` span
//!
//! ```rust,ignore
//! use repo_scout::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::development())?;
//! ```
//!
//! Recording calls elsewhere in the crate sit behind `#[cfg(feature = "telemetry")]`.

mod correlation;
mod init;
pub mod metrics;
pub mod spans;

pub use correlation::CorrelationId;
pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{BackendMetrics, Histogram, Metrics, MetricsSnapshot, OperationMetrics, GLOBAL_METRICS};
pub use spans::{BackendSpan, TimedOperation};
