//! Timing Metrics
//!
//! Per-label operation counters and latency tracking, with scoped timers.
//! A `Metrics` value is owned by whoever instruments the calls; there is
//! no process-wide registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

/// Latency totals for one label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelStats {
    pub count: u64,
    pub total_us: u64,
    pub min_us: u64,
    pub max_us: u64,
}

impl LabelStats {
    fn new() -> Self {
        Self {
            count: 0,
            total_us: 0,
            min_us: u64::MAX,
            max_us: 0,
        }
    }

    fn record(&mut self, latency_us: u64) {
        self.count += 1;
        self.total_us = self.total_us.saturating_add(latency_us);
        self.min_us = self.min_us.min(latency_us);
        self.max_us = self.max_us.max(latency_us);
    }

    /// Average latency in microseconds
    pub fn avg_us(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_us as f64 / self.count as f64
    }
}

/// Metrics collector
#[derive(Debug)]
pub struct Metrics {
    /// Total operations count
    total_ops: AtomicU64,

    /// Latency per label
    by_label: RwLock<HashMap<String, LabelStats>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            total_ops: AtomicU64::new(0),
            by_label: RwLock::new(HashMap::new()),
        }
    }

    /// Record an operation
    pub fn record_operation(&self, label: &str, latency: Duration) {
        self.total_ops.fetch_add(1, Ordering::Relaxed);

        let latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        let mut by_label = self.by_label.write();
        by_label
            .entry(label.to_string())
            .or_insert_with(LabelStats::new)
            .record(latency_us);
    }

    /// Start a timer that records under `label` when dropped
    pub fn time<'a>(&'a self, label: &'a str) -> Timer<'a> {
        Timer {
            metrics: self,
            label,
            started: Instant::now(),
        }
    }

    /// Get total operations count
    pub fn total_ops(&self) -> u64 {
        self.total_ops.load(Ordering::Relaxed)
    }

    /// Stats for one label
    pub fn label(&self, label: &str) -> Option<LabelStats> {
        self.by_label.read().get(label).copied()
    }

    /// Stats for every label
    pub fn labels(&self) -> HashMap<String, LabelStats> {
        self.by_label.read().clone()
    }

    /// Get a summary of metrics
    pub fn summary(&self) -> String {
        let by_label = self.by_label.read();
        let mut labels: Vec<_> = by_label.iter().collect();
        labels.sort_by(|a, b| a.0.cmp(b.0));

        let mut out = format!("Operations: {}", self.total_ops());
        for (label, stats) in labels {
            out.push_str(&format!(
                " | {}: n={} avg={:.1}µs min={}µs max={}µs",
                label,
                stats.count,
                stats.avg_us(),
                stats.min_us,
                stats.max_us
            ));
        }
        out
    }
}

/// Scoped timer; records its elapsed time when dropped
#[must_use = "the timer records when dropped"]
pub struct Timer<'a> {
    metrics: &'a Metrics,
    label: &'a str,
    started: Instant,
}

impl Timer<'_> {
    /// Time elapsed so far
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        self.metrics.record_operation(self.label, elapsed);
        debug!("Timer {}: {}", self.label, format_elapsed(elapsed));
    }
}

/// Human-readable elapsed time, coarsest unit first
///
/// `"2 days, 3 hours, 4 minutes"`, `"1 hours, 5 minutes"`,
/// `"3 minutes, 12.500 seconds"`, `"1.250 seconds"` or `"42 ms"`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let delta = chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::MAX);

    let days = delta.num_days();
    let hours = delta.num_hours() % 24;
    let minutes = delta.num_minutes() % 60;
    let millis = delta.num_milliseconds() % 60_000;

    if days > 0 {
        format!("{} days, {} hours, {} minutes", days, hours, minutes)
    } else if hours > 0 {
        format!("{} hours, {} minutes", hours, minutes)
    } else if minutes > 0 {
        format!("{} minutes, {:.3} seconds", minutes, millis as f64 / 1000.0)
    } else if millis >= 1000 {
        format!("{:.3} seconds", millis as f64 / 1000.0)
    } else {
        format!("{} ms", millis)
    }
}
