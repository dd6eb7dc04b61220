// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process metrics for backend calls, model calls, and turns.
//!
//! Lightweight and dependency-free apart from `once_cell`; a CLI that answers a
//! handful of questions has no use for an exporter.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Central metrics collection.
#[derive(Debug)]
pub struct Metrics {
    /// Backend calls keyed by backend name (`sqlite`, `git`, `github`, `tavily`, ...).
    backends: RwLock<BTreeMap<String, BackendMetrics>>,

    /// Timed operations such as model calls and agent dispatches.
    operations: RwLock<BTreeMap<String, OperationMetrics>>,

    tokens: Counters<2>,

    /// turns, rounds, repairs
    turns: Counters<3>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(BTreeMap::new()),
            operations: RwLock::new(BTreeMap::new()),
            tokens: Counters::new(),
            turns: Counters::new(),
            start_time: Instant::now(),
        }
    }

    /// Record one backend call.
    pub fn record_backend(&self, name: &str, duration: Duration, success: bool) {
        let mut backends = self.backends.write().unwrap_or_else(PoisonError::into_inner);
        backends
            .entry(name.to_string())
            .or_default()
            .record(duration, success);
    }

    /// Record a timed operation.
    pub fn record_operation(&self, name: &str, duration: Duration) {
        let mut ops = self.operations.write().unwrap_or_else(PoisonError::into_inner);
        ops.entry(name.to_string()).or_default().record(duration);
    }

    /// Record token usage.
    pub fn record_tokens(&self, input: u64, output: u64) {
        self.tokens.add(0, input);
        self.tokens.add(1, output);
    }

    /// Record a finished turn with its round and repair counts.
    pub fn record_turn(&self, rounds: u32, repairs: u32) {
        self.turns.add(0, 1);
        self.turns.add(1, rounds as u64);
        self.turns.add(2, repairs as u64);
    }

    pub fn backend_metrics(&self, name: &str) -> Option<BackendMetrics> {
        self.backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn operation_metrics(&self, name: &str) -> Option<OperationMetrics> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Total (input, output) tokens.
    pub fn token_counts(&self) -> (u64, u64) {
        (self.tokens.get(0), self.tokens.get(1))
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            backends: self.backends.read().unwrap_or_else(PoisonError::into_inner).clone(),
            operations: self.operations.read().unwrap_or_else(PoisonError::into_inner).clone(),
            input_tokens: self.tokens.get(0),
            output_tokens: self.tokens.get(1),
            turns: self.turns.get(0),
            rounds: self.turns.get(1),
            repairs: self.turns.get(2),
            uptime: self.uptime(),
        }
    }

    pub fn format_report(&self) -> String {
        self.snapshot().format_report()
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        self.backends.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.operations.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.tokens.reset();
        self.turns.reset();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Call statistics for one backend.
#[derive(Debug, Clone)]
pub struct BackendMetrics {
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
}

impl BackendMetrics {
    pub fn new() -> Self {
        Self {
            calls: 0,
            successes: 0,
            failures: 0,
            total_duration: Duration::ZERO,
            max_duration: Duration::ZERO,
        }
    }

    pub fn record(&mut self, duration: Duration, success: bool) {
        self.calls += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.total_duration += duration;
        self.max_duration = self.max_duration.max(duration);
    }

    pub fn avg_duration(&self) -> Duration {
        match u32::try_from(self.calls) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_duration / n,
        }
    }

    /// Fraction of successful calls (1.0 when nothing was called).
    pub fn success_rate(&self) -> f64 {
        if self.calls == 0 {
            1.0
        } else {
            self.successes as f64 / self.calls as f64
        }
    }
}

impl Default for BackendMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Operation metrics with a latency histogram.
#[derive(Debug, Clone, Default)]
pub struct OperationMetrics {
    pub count: u64,
    pub total_duration: Duration,
    pub histogram: Histogram,
}

impl OperationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.histogram.record(duration);
    }

    pub fn avg_duration(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_duration / n,
        }
    }
}

/// Fixed-bucket latency histogram.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Upper bucket bounds in milliseconds; one overflow bucket follows.
    bounds_ms: Vec<u64>,
    counts: Vec<u64>,
}

impl Histogram {
    pub fn with_bounds(bounds_ms: Vec<u64>) -> Self {
        let counts = vec![0; bounds_ms.len() + 1];
        Self { bounds_ms, counts }
    }

    pub fn record(&mut self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        let idx = self
            .bounds_ms
            .iter()
            .position(|&b| ms <= b)
            .unwrap_or(self.bounds_ms.len());
        self.counts[idx] += 1;
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Upper bound of the bucket holding the `p`th percentile.
    pub fn percentile(&self, p: f64) -> Duration {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return Duration::ZERO;
        }

        let target = (total as f64 * p / 100.0).ceil().max(1.0) as u64;
        let mut cumulative = 0u64;
        for (i, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                let ms = self
                    .bounds_ms
                    .get(i)
                    .copied()
                    .unwrap_or_else(|| self.bounds_ms.last().copied().unwrap_or(0) * 2);
                return Duration::from_millis(ms);
            }
        }
        Duration::ZERO
    }

    pub fn p50(&self) -> Duration {
        self.percentile(50.0)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // Model and network calls: 10ms up to 2 minutes.
        Self::with_bounds(vec![10, 100, 500, 1_000, 5_000, 15_000, 60_000, 120_000])
    }
}

#[derive(Debug)]
struct Counters<const N: usize>([AtomicU64; N]);

impl<const N: usize> Counters<N> {
    fn new() -> Self {
        Self(std::array::from_fn(|_| AtomicU64::new(0)))
    }

    fn add(&self, idx: usize, n: u64) {
        self.0[idx].fetch_add(n, Ordering::Relaxed);
    }

    fn get(&self, idx: usize) -> u64 {
        self.0[idx].load(Ordering::Relaxed)
    }

    fn reset(&self) {
        for c in &self.0 {
            c.store(0, Ordering::Relaxed);
        }
    }
}

/// A snapshot of all metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub backends: BTreeMap<String, BackendMetrics>,
    pub operations: BTreeMap<String, OperationMetrics>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub turns: u64,
    pub rounds: u64,
    pub repairs: u64,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Format as a human-readable report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        let _ = writeln!(report, "=== Metrics Report ===");
        let _ = writeln!(report, "Uptime: {:.2?}", self.uptime);
        let _ = writeln!(
            report,
            "Turns: {} ({} rounds, {} repairs)",
            self.turns, self.rounds, self.repairs
        );
        let _ = writeln!(
            report,
            "Tokens: {} input, {} output",
            self.input_tokens, self.output_tokens
        );

        if !self.backends.is_empty() {
            let _ = writeln!(report, "\nBackends:");
            for (name, m) in &self.backends {
                let _ = writeln!(
                    report,
                    "  {name}: {} calls, {:.1}% success, avg {:.2?}, max {:.2?}",
                    m.calls,
                    m.success_rate() * 100.0,
                    m.avg_duration(),
                    m.max_duration
                );
            }
        }

        if !self.operations.is_empty() {
            let _ = writeln!(report, "\nOperations:");
            for (name, m) in &self.operations {
                let _ = writeln!(
                    report,
                    "  {name}: {} ops, avg {:.2?}, p50 {:.2?}, p99 {:.2?}",
                    m.count,
                    m.avg_duration(),
                    m.histogram.p50(),
                    m.histogram.p99()
                );
            }
        }

        report
    }
}
