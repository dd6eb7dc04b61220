// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! RAII timers that feed [`GLOBAL_METRICS`](super::metrics::GLOBAL_METRICS).

use std::time::{Duration, Instant};
use tracing::{debug_span, Span};

/// Times one backend call and records it when finished or dropped.
///
/// A span dropped without [`finish`](Self::finish) counts as a failure, so a call
/// abandoned by `?` or a cancelled future still shows up in the report.
pub struct BackendSpan {
    backend: &'static str,
    start: Instant,
    span: Span,
    recorded: bool,
}

impl BackendSpan {
    pub fn start(backend: &'static str) -> Self {
        let span = debug_span!(
            "backend",
            backend = backend,
            duration_ms = tracing::field::Empty,
            success = tracing::field::Empty,
        );
        Self {
            backend,
            start: Instant::now(),
            span,
            recorded: false,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn finish(mut self, success: bool) -> Duration {
        self.record(success)
    }

    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) -> Duration {
        self.finish(result.is_ok())
    }

    fn record(&mut self, success: bool) -> Duration {
        let duration = self.start.elapsed();
        if !self.recorded {
            self.recorded = true;
            self.span.record("duration_ms", duration.as_secs_f64() * 1000.0);
            self.span.record("success", success);
            super::metrics::GLOBAL_METRICS.record_backend(self.backend, duration, success);
        }
        duration
    }
}

impl Drop for BackendSpan {
    fn drop(&mut self) {
        self.record(false);
    }
}

/// Times an arbitrary operation; records on drop.
pub struct TimedOperation {
    name: String,
    start: Instant,
}

impl TimedOperation {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimedOperation {
    fn drop(&mut self) {
        super::metrics::GLOBAL_METRICS.record_operation(&self.name, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::metrics::GLOBAL_METRICS;

    #[test]
    fn test_backend_span_records_once() {
        let span = BackendSpan::start("test.backend_once");
        span.finish(true);

        let metrics = GLOBAL_METRICS.backend_metrics("test.backend_once").unwrap();
        assert_eq!(metrics.calls, 1);
        assert_eq!(metrics.successes, 1);
    }

    #[test]
    fn test_backend_span_drop_counts_as_failure() {
        {
            let _span = BackendSpan::start("test.backend_dropped");
        }
        let metrics = GLOBAL_METRICS.backend_metrics("test.backend_dropped").unwrap();
        assert_eq!(metrics.failures, 1);
    }

    #[test]
    fn test_timed_operation_records_on_drop() {
        {
            let op = TimedOperation::start("test.timed_op");
            assert!(op.elapsed() < Duration::from_secs(5));
        }
        assert_eq!(GLOBAL_METRICS.operation_metrics("test.timed_op").unwrap().count, 1);
    }
}
