//! The unit of work repeated by every actor: one HTTP GET, timed.

use crate::error::StampedeResult;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tracing::debug;

/// Target endpoint probed when no other URL is configured.
pub const DEFAULT_TARGET_URL: &str = "http://localhost:8080/test";

/// Request timeout applied when no other timeout is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a single probe invocation.
///
/// Transport-level failures are a distinct variant rather than a sentinel
/// status value: a 500 still proves the connection worked, while
/// `ConnectionFailed` means no response ever arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server responded; any HTTP status.
    Response {
        /// Status code of the response.
        status: StatusCode,
    },

    /// Connection refused, timeout before any response, or DNS failure.
    ConnectionFailed,
}

impl ProbeOutcome {
    /// Status code of the response, if one arrived.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Response { status } => Some(*status),
            Self::ConnectionFailed => None,
        }
    }

    /// True when no response arrived at the transport level.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::ConnectionFailed)
    }
}

/// Per-invocation record produced by a probe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    /// What came back.
    pub outcome: ProbeOutcome,

    /// Time from issuing the request until the outcome was known.
    pub latency: Duration,
}

/// The unit of work an actor repeats once per iteration.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Execute one iteration's worth of work and report what happened.
    ///
    /// Implementations never propagate request failures as errors; they
    /// fold them into the returned outcome so the run keeps going.
    async fn run(&self) -> ProbeResult;
}

/// Default probe: a single GET against a fixed URL.
///
/// No retries. Request-level failures (connection refused, timeout, DNS)
/// surface as [`ProbeOutcome::ConnectionFailed`] and count once.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// Creates a probe with the default request timeout.
    pub fn new(url: impl Into<String>) -> StampedeResult<Self> {
        Self::with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a probe with an explicit request timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> StampedeResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// The URL this probe targets.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn run(&self) -> ProbeResult {
        let start = Instant::now();

        let outcome = match self.client.get(&self.url).send().await {
            Ok(response) => ProbeOutcome::Response {
                status: response.status(),
            },
            Err(err) => {
                debug!(url = %self.url, error = %err, "probe request failed");
                ProbeOutcome::ConnectionFailed
            }
        };

        ProbeResult {
            outcome,
            latency: start.elapsed(),
        }
    }
}
