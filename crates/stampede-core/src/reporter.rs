//! Report generation for finished load runs.

use crate::error::StampedeResult;
use crate::metrics::RunMetrics;
use crate::thresholds::{ThresholdSet, ThresholdVerdict};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown report format `{}`, expected `markdown` or `json`",
                other
            )),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markdown => f.write_str("markdown"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Final report for one run: metrics plus threshold verdicts.
pub struct RunReport {
    scenario_name: String,
    metrics: RunMetrics,
    verdicts: Vec<ThresholdVerdict>,
}

impl RunReport {
    /// Evaluate the thresholds against the finished run and build a report.
    pub fn new(
        scenario_name: impl Into<String>,
        metrics: RunMetrics,
        thresholds: &ThresholdSet,
    ) -> Self {
        let verdicts = thresholds.evaluate(&metrics);
        Self {
            scenario_name: scenario_name.into(),
            metrics,
            verdicts,
        }
    }

    /// Aggregate metrics for the run.
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Per-threshold verdicts.
    pub fn verdicts(&self) -> &[ThresholdVerdict] {
        &self.verdicts
    }

    /// Check if every threshold held.
    pub fn passes(&self) -> bool {
        self.verdicts.iter().all(|v| v.passed)
    }

    /// Get a summary of violated thresholds.
    pub fn failure_summary(&self) -> String {
        let failures: Vec<String> = self
            .verdicts
            .iter()
            .filter(|v| !v.passed)
            .map(|v| {
                format!(
                    "{}: `{}` violated (observed {})",
                    v.metric,
                    v.expression,
                    v.observed_display()
                )
            })
            .collect();

        if failures.is_empty() {
            return "All thresholds passed".to_string();
        }

        failures.join("\n")
    }

    /// Render the report in the requested format.
    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Markdown => self.generate_markdown(),
            ReportFormat::Json => self.generate_json(),
        }
    }

    /// Write the report to a file.
    pub fn write_report(&self, path: impl AsRef<Path>, format: ReportFormat) -> StampedeResult<()> {
        let content = self.render(format);

        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Generate a Markdown report.
    fn generate_markdown(&self) -> String {
        let status = if self.passes() {
            "✅ PASSED"
        } else {
            "❌ FAILED"
        };

        let mut checks_rows = String::new();
        for (name, stats) in &self.metrics.checks {
            checks_rows.push_str(&format!(
                "| {} | {} | {} | {:.2}% |\n",
                name,
                stats.passes,
                stats.fails,
                stats.pass_rate() * 100.0
            ));
        }
        if checks_rows.is_empty() {
            checks_rows.push_str("| - | - | - | - |\n");
        }

        let mut threshold_rows = String::new();
        for verdict in &self.verdicts {
            threshold_rows.push_str(&format!(
                "| {} | `{}` | {} | {} |\n",
                verdict.metric,
                verdict.expression,
                verdict.observed_display(),
                if verdict.passed { "✅" } else { "❌" }
            ));
        }
        if threshold_rows.is_empty() {
            threshold_rows.push_str("| - | - | - | - |\n");
        }

        format!(
            r#"# Load Run Report: {}

**Status**: {}

---

## Summary

- **Duration**: {:.1} seconds
- **Total Requests**: {}
- **Successful**: {}
- **Failed**: {}
- **Failure Rate**: {:.4}%
- **Throughput**: {:.1} req/s

---

## Latency

| Percentile | Latency |
|------------|---------|
| P50 | {:.2}ms |
| P90 | {:.2}ms |
| P95 | {:.2}ms |
| P99 | {:.2}ms |
| Max | {:.2}ms |

---

## Checks

| Check | Passes | Fails | Pass Rate |
|-------|--------|-------|-----------|
{}
---

## Thresholds

| Metric | Expression | Observed | Status |
|--------|------------|----------|--------|
{}
---

**Report Generated**: {}
"#,
            self.scenario_name,
            status,
            self.metrics.duration().as_secs_f64(),
            self.metrics.total_requests,
            self.metrics.successful_requests,
            self.metrics.failed_requests,
            self.metrics.failure_rate() * 100.0,
            self.metrics.throughput_rps(),
            self.metrics.p50_latency().as_secs_f64() * 1000.0,
            self.metrics.p90_latency().as_secs_f64() * 1000.0,
            self.metrics.p95_latency().as_secs_f64() * 1000.0,
            self.metrics.p99_latency().as_secs_f64() * 1000.0,
            self.metrics.max_latency().as_secs_f64() * 1000.0,
            checks_rows,
            threshold_rows,
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )
    }

    /// Generate a JSON report.
    fn generate_json(&self) -> String {
        let checks: serde_json::Map<String, serde_json::Value> = self
            .metrics
            .checks
            .iter()
            .map(|(name, stats)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "passes": stats.passes,
                        "fails": stats.fails,
                        "pass_rate": stats.pass_rate(),
                    }),
                )
            })
            .collect();

        let thresholds: Vec<serde_json::Value> = self
            .verdicts
            .iter()
            .map(|v| {
                serde_json::json!({
                    "metric": v.metric.as_str(),
                    "expression": v.expression,
                    "observed": v.observed,
                    "passed": v.passed,
                })
            })
            .collect();

        serde_json::json!({
            "scenario": self.scenario_name,
            "status": if self.passes() { "passed" } else { "failed" },
            "duration_seconds": self.metrics.duration().as_secs_f64(),
            "total_requests": self.metrics.total_requests,
            "successful_requests": self.metrics.successful_requests,
            "failed_requests": self.metrics.failed_requests,
            "failure_rate": self.metrics.failure_rate(),
            "throughput_rps": self.metrics.throughput_rps(),
            "latency_ms": {
                "p50": self.metrics.p50_latency().as_secs_f64() * 1000.0,
                "p90": self.metrics.p90_latency().as_secs_f64() * 1000.0,
                "p95": self.metrics.p95_latency().as_secs_f64() * 1000.0,
                "p99": self.metrics.p99_latency().as_secs_f64() * 1000.0,
                "max": self.metrics.max_latency().as_secs_f64() * 1000.0,
            },
            "checks": checks,
            "thresholds": thresholds,
        })
        .to_string()
    }
}
