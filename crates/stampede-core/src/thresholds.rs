//! Pass/fail thresholds evaluated against aggregate run metrics.
//!
//! Thresholds are declared as predicate strings on well-known metric names
//! (`http_req_failed: rate<0.3`, `http_req_duration: p(95)<3000`) and
//! evaluated exactly once, after all iterations complete. A violated
//! threshold marks the run failed; it never aborts in-flight work.

use crate::error::{StampedeError, StampedeResult};
use crate::metrics::RunMetrics;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Metric a threshold is declared on. The names are the configuration
/// surface's wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    /// Failed-request rate.
    HttpReqFailed,

    /// Request latency distribution.
    HttpReqDuration,
}

impl Metric {
    /// Wire name of the metric.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpReqFailed => "http_req_failed",
            Self::HttpReqDuration => "http_req_duration",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = StampedeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http_req_failed" => Ok(Self::HttpReqFailed),
            "http_req_duration" => Ok(Self::HttpReqDuration),
            other => Err(StampedeError::invalid_threshold(
                other,
                "unknown metric, expected `http_req_failed` or `http_req_duration`",
            )),
        }
    }
}

/// Parsed threshold predicate. All comparisons are strict.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `rate<N`: aggregate rate strictly below `N`.
    RateBelow(f64),

    /// `p(P)<N`: latency percentile `P` strictly below `N` milliseconds.
    PercentileBelow {
        /// Percentile in 0-100 (e.g. 95.0).
        percentile: f64,
        /// Limit in milliseconds.
        limit_ms: f64,
    },
}

impl Condition {
    /// Parse a predicate expression (`rate<0.3`, `p(95)<3000`).
    pub fn parse(expression: &str) -> StampedeResult<Self> {
        let expr = expression.trim();

        if let Some(value) = expr.strip_prefix("rate<") {
            let rate: f64 = value.trim().parse().map_err(|_| {
                StampedeError::invalid_threshold(expression, "rate limit is not a number")
            })?;
            if !(0.0..=1.0).contains(&rate) {
                return Err(StampedeError::invalid_threshold(
                    expression,
                    "rate limit must be within 0.0-1.0",
                ));
            }
            return Ok(Self::RateBelow(rate));
        }

        if let Some(rest) = expr.strip_prefix("p(") {
            let (percentile_str, limit_str) = rest.split_once(")<").ok_or_else(|| {
                StampedeError::invalid_threshold(expression, "expected the form `p(95)<3000`")
            })?;
            let percentile: f64 = percentile_str.trim().parse().map_err(|_| {
                StampedeError::invalid_threshold(expression, "percentile is not a number")
            })?;
            if !(0.0..=100.0).contains(&percentile) {
                return Err(StampedeError::invalid_threshold(
                    expression,
                    "percentile must be within 0-100",
                ));
            }
            let limit_ms: f64 = limit_str.trim().parse().map_err(|_| {
                StampedeError::invalid_threshold(expression, "millisecond limit is not a number")
            })?;
            return Ok(Self::PercentileBelow {
                percentile,
                limit_ms,
            });
        }

        Err(StampedeError::invalid_threshold(
            expression,
            "expected `rate<N` or `p(P)<N`",
        ))
    }

    /// Whether this condition can be evaluated against the given metric.
    fn applies_to(&self, metric: Metric) -> bool {
        matches!(
            (self, metric),
            (Self::RateBelow(_), Metric::HttpReqFailed)
                | (Self::PercentileBelow { .. }, Metric::HttpReqDuration)
        )
    }
}

/// One declared threshold: a metric, its parsed condition, and the source
/// expression kept for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    /// Metric the condition is evaluated on.
    pub metric: Metric,

    /// Parsed predicate.
    pub condition: Condition,

    /// Source expression as written in configuration.
    pub expression: String,
}

impl Threshold {
    /// Parse one threshold from a metric name and predicate expression.
    pub fn parse(metric: &str, expression: &str) -> StampedeResult<Self> {
        let metric: Metric = metric.parse()?;
        let condition = Condition::parse(expression)?;

        if !condition.applies_to(metric) {
            return Err(StampedeError::invalid_threshold(
                expression,
                format!("condition does not apply to metric `{}`", metric),
            ));
        }

        Ok(Self {
            metric,
            condition,
            expression: expression.trim().to_string(),
        })
    }
}

/// Verdict for one threshold after a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdVerdict {
    /// Metric the threshold was declared on.
    pub metric: Metric,

    /// Source expression.
    pub expression: String,

    /// Observed value: a rate in 0.0-1.0, or a latency in milliseconds.
    pub observed: f64,

    /// Whether the predicate held.
    pub passed: bool,
}

impl ThresholdVerdict {
    /// Observed value formatted in the unit of the declared condition.
    pub fn observed_display(&self) -> String {
        match self.metric {
            Metric::HttpReqFailed => format!("{:.4}", self.observed),
            Metric::HttpReqDuration => format!("{:.2}ms", self.observed),
        }
    }
}

/// The full set of thresholds for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSet {
    thresholds: Vec<Threshold>,
}

impl ThresholdSet {
    /// Creates a set from already-parsed thresholds.
    pub fn new(thresholds: Vec<Threshold>) -> Self {
        Self { thresholds }
    }

    /// Parse a configuration map of metric name to predicate expressions.
    pub fn parse(map: &BTreeMap<String, Vec<String>>) -> StampedeResult<Self> {
        let mut thresholds = Vec::new();

        for (metric, expressions) in map {
            for expression in expressions {
                thresholds.push(Threshold::parse(metric, expression)?);
            }
        }

        Ok(Self::new(thresholds))
    }

    /// The declared thresholds.
    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    /// Evaluate every threshold against the finished run's metrics.
    pub fn evaluate(&self, metrics: &RunMetrics) -> Vec<ThresholdVerdict> {
        self.thresholds
            .iter()
            .map(|threshold| {
                let (observed, passed) = match &threshold.condition {
                    Condition::RateBelow(limit) => {
                        let rate = metrics.failure_rate();
                        (rate, rate < *limit)
                    }
                    Condition::PercentileBelow {
                        percentile,
                        limit_ms,
                    } => {
                        let observed_ms =
                            metrics.percentile(*percentile / 100.0).as_secs_f64() * 1000.0;
                        (observed_ms, observed_ms < *limit_ms)
                    }
                };

                ThresholdVerdict {
                    metric: threshold.metric,
                    expression: threshold.expression.clone(),
                    observed,
                    passed,
                }
            })
            .collect()
    }

    /// True when every threshold holds for the given metrics.
    pub fn passes(&self, metrics: &RunMetrics) -> bool {
        self.evaluate(metrics).iter().all(|verdict| verdict.passed)
    }
}

impl Default for ThresholdSet {
    /// The authored defaults: failure rate strictly under 30%, P95 latency
    /// strictly under 3000ms.
    fn default() -> Self {
        Self::new(vec![
            Threshold {
                metric: Metric::HttpReqFailed,
                condition: Condition::RateBelow(0.3),
                expression: "rate<0.3".to_string(),
            },
            Threshold {
                metric: Metric::HttpReqDuration,
                condition: Condition::PercentileBelow {
                    percentile: 95.0,
                    limit_ms: 3000.0,
                },
                expression: "p(95)<3000".to_string(),
            },
        ])
    }
}
