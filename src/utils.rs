use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::time::{Duration, Instant};

/// Debounce helper to prevent rapid repeated triggers
pub struct Debouncer {
    last_trigger: Option<Instant>,
    debounce_duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given quiet period
    pub fn new(debounce_duration: Duration) -> Self {
        Self {
            last_trigger: None,
            debounce_duration,
        }
    }

    /// Check if enough time has passed since last trigger
    /// Returns true if we should trigger, false if still in debounce period
    pub fn should_trigger(&mut self) -> bool {
        let now = Instant::now();

        match self.last_trigger {
            Some(last) if now.duration_since(last) < self.debounce_duration => false,
            _ => {
                self.last_trigger = Some(now);
                true
            }
        }
    }

    /// Reset the debouncer
    pub fn reset(&mut self) {
        self.last_trigger = None;
    }
}

/// `Authorization` header value for HTTP basic auth
pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

/// Timing measurements for one evaluated frame
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleTiming {
    pub inference_us: f64,
    pub notify_us: f64,
    pub total_us: f64,
}

impl CycleTiming {
    /// Time spent in rule matching itself
    pub fn rules_us(&self) -> f64 {
        (self.total_us - self.inference_us - self.notify_us).max(0.0)
    }
}

/// Statistics collector for latency measurements
pub struct LatencyStats {
    timings: Vec<CycleTiming>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            timings: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timings: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, timing: CycleTiming) {
        self.timings.push(timing);
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    pub fn clear(&mut self) {
        self.timings.clear();
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx]
    }

    /// Mean, p50, p95 and p99 for one stage
    fn stage_stats(&self, extract: impl Fn(&CycleTiming) -> f64) -> (f64, f64, f64, f64) {
        if self.timings.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let mut values: Vec<f64> = self.timings.iter().map(&extract).collect();
        values.sort_by(|a, b| a.total_cmp(b));

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let p50 = Self::percentile(&values, 50.0);
        let p95 = Self::percentile(&values, 95.0);
        let p99 = Self::percentile(&values, 99.0);

        (mean, p50, p95, p99)
    }

    /// Log a latency report for the collected cycles
    pub fn log_report(&self) {
        if self.timings.is_empty() {
            tracing::info!("No timing data collected");
            return;
        }

        tracing::info!("Cycle latency over {} evaluated frames", self.timings.len());
        Self::log_row("Inference", self.stage_stats(|t| t.inference_us));
        Self::log_row("Rules", self.stage_stats(CycleTiming::rules_us));
        Self::log_row("Notify", self.stage_stats(|t| t.notify_us));
        Self::log_row("Total", self.stage_stats(|t| t.total_us));
    }

    fn log_row(name: &str, stats: (f64, f64, f64, f64)) {
        tracing::info!(
            "  {:<10} mean {:>8.0} µs | p50 {:>8.0} µs | p95 {:>8.0} µs | p99 {:>8.0} µs",
            name,
            stats.0,
            stats.1,
            stats.2,
            stats.3
        );
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}
