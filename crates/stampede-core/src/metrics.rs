//! Metrics collection and analysis for a load run.

use crate::checks::standard_checks;
use crate::probe::{ProbeOutcome, ProbeResult};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Pass/fail tallies for one named check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckStats {
    /// Iterations on which the check held.
    pub passes: usize,

    /// Iterations on which the check failed.
    pub fails: usize,
}

impl CheckStats {
    /// Total number of evaluations.
    pub fn total(&self) -> usize {
        self.passes + self.fails
    }

    /// Fraction of evaluations that passed (0.0-1.0).
    pub fn pass_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.passes as f64 / self.total() as f64
    }
}

/// Aggregate metrics from a load run.
#[derive(Debug, Clone)]
pub struct RunMetrics {
    /// Run start time.
    pub start_time: Instant,

    /// Run end time.
    pub end_time: Instant,

    /// Total requests attempted.
    pub total_requests: usize,

    /// Requests that got an expected (2xx/3xx) response.
    pub successful_requests: usize,

    /// Requests that failed: connection failure or status >= 400.
    pub failed_requests: usize,

    /// Latencies in microseconds. Only iterations that received a response
    /// contribute a sample; a connection failure has no request duration.
    pub latencies_us: Vec<u64>,

    /// Per-check pass/fail tallies, keyed by check name.
    pub checks: BTreeMap<String, CheckStats>,
}

impl Default for RunMetrics {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            end_time: now,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            latencies_us: Vec::new(),
            checks: BTreeMap::new(),
        }
    }
}

impl RunMetrics {
    /// Calculate the failed-request rate (0.0-1.0).
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.failed_requests as f64 / self.total_requests as f64
    }

    /// Calculate throughput (requests per second over the whole run).
    pub fn throughput_rps(&self) -> f64 {
        let duration = self.duration();
        if duration.as_secs_f64() == 0.0 {
            return 0.0;
        }
        self.total_requests as f64 / duration.as_secs_f64()
    }

    /// Get run duration.
    pub fn duration(&self) -> Duration {
        self.end_time.duration_since(self.start_time)
    }

    /// Get P50 latency.
    pub fn p50_latency(&self) -> Duration {
        self.percentile(0.50)
    }

    /// Get P90 latency.
    pub fn p90_latency(&self) -> Duration {
        self.percentile(0.90)
    }

    /// Get P95 latency.
    pub fn p95_latency(&self) -> Duration {
        self.percentile(0.95)
    }

    /// Get P99 latency.
    pub fn p99_latency(&self) -> Duration {
        self.percentile(0.99)
    }

    /// Get max latency.
    pub fn max_latency(&self) -> Duration {
        Duration::from_micros(self.latencies_us.iter().copied().max().unwrap_or(0))
    }

    /// Calculate a latency percentile (`p` in 0.0-1.0).
    pub fn percentile(&self, p: f64) -> Duration {
        if self.latencies_us.is_empty() {
            return Duration::from_micros(0);
        }

        let mut sorted = self.latencies_us.clone();
        sorted.sort_unstable();

        let index = ((sorted.len() as f64) * p) as usize;
        let index = index.min(sorted.len() - 1);

        Duration::from_micros(sorted[index])
    }

    /// Tallies for one named check.
    pub fn check(&self, name: &str) -> CheckStats {
        self.checks.get(name).copied().unwrap_or_default()
    }
}

/// Collector shared by all actors during a run.
pub struct MetricsCollector {
    metrics: RunMetrics,
}

impl MetricsCollector {
    /// Create a collector; the run clock starts now.
    pub fn new() -> Self {
        Self {
            metrics: RunMetrics {
                start_time: Instant::now(),
                ..Default::default()
            },
        }
    }

    /// Record one probe result: request counts, the latency sample, and
    /// both standard checks (each always evaluated, never short-circuited).
    ///
    /// A request counts as failed when the connection failed or the status
    /// is >= 400; redirects count as successful.
    pub fn record(&mut self, result: &ProbeResult) {
        self.metrics.total_requests += 1;

        match &result.outcome {
            ProbeOutcome::Response { status } => {
                self.metrics
                    .latencies_us
                    .push(result.latency.as_micros() as u64);

                if status.as_u16() < 400 {
                    self.metrics.successful_requests += 1;
                } else {
                    self.metrics.failed_requests += 1;
                }
            }
            ProbeOutcome::ConnectionFailed => {
                self.metrics.failed_requests += 1;
            }
        }

        for check in standard_checks() {
            let stats = self.metrics.checks.entry(check.name.to_string()).or_default();
            if check.evaluate(&result.outcome) {
                stats.passes += 1;
            } else {
                stats.fails += 1;
            }
        }
    }

    /// Get a point-in-time snapshot of the metrics.
    pub fn snapshot(&self) -> RunMetrics {
        let mut metrics = self.metrics.clone();
        metrics.end_time = Instant::now();
        metrics
    }

    /// Finalize metrics collection.
    pub fn finalize(mut self) -> RunMetrics {
        self.metrics.end_time = Instant::now();
        self.metrics
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
