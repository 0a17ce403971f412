//! Configuration management for stampede.
//!
//! This module provides a layered configuration system that supports:
//! - YAML configuration files
//! - Environment variable overrides
//! - Defaults equal to the built-in burst scenario
//! - Configuration validation

use crate::error::{StampedeError, StampedeResult};
use crate::probe::DEFAULT_TARGET_URL;
use crate::profile::{LoadProfile, Stage};
use crate::runner::{RunnerConfig, DEFAULT_THINK_TIME, DEFAULT_TICK_INTERVAL};
use crate::thresholds::ThresholdSet;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure for a load run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StampedeConfig {
    #[serde(default)]
    pub scenario: ScenarioConfig,

    /// Staged ramp; defaults to the built-in burst profile.
    #[serde(default = "default_stages")]
    pub stages: Vec<Stage>,

    /// Metric name to predicate expressions.
    #[serde(default = "default_thresholds")]
    pub thresholds: BTreeMap<String, Vec<String>>,
}

/// Scenario-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    /// Scenario name, used in logs and reports.
    #[serde(default = "default_name")]
    pub name: String,

    /// Endpoint every probe iteration targets.
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Pause at the end of every iteration, in milliseconds.
    #[serde(default = "default_think_time_ms")]
    pub think_time_ms: u64,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Supervisor reconciliation interval, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_name() -> String {
    "connection-burst".to_string()
}

fn default_target_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}

fn default_think_time_ms() -> u64 {
    DEFAULT_THINK_TIME.as_millis() as u64
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL.as_millis() as u64
}

fn default_stages() -> Vec<Stage> {
    LoadProfile::default().stages().to_vec()
}

fn default_thresholds() -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();
    map.insert("http_req_failed".to_string(), vec!["rate<0.3".to_string()]);
    map.insert(
        "http_req_duration".to_string(),
        vec!["p(95)<3000".to_string()],
    );
    map
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            target_url: default_target_url(),
            think_time_ms: default_think_time_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for StampedeConfig {
    fn default() -> Self {
        Self {
            scenario: ScenarioConfig::default(),
            stages: default_stages(),
            thresholds: default_thresholds(),
        }
    }
}

impl StampedeConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file specified by STAMPEDE_CONFIG env var
    /// 3. ./config/stampede.yaml
    /// 4. Built-in defaults (lowest priority)
    pub fn load() -> StampedeResult<Self> {
        let mut builder = Config::builder();

        if let Ok(config_path) = std::env::var("STAMPEDE_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder.add_source(File::with_name("./config/stampede").required(false));

        // Override with environment variables
        // Example: STAMPEDE_SCENARIO__TARGET_URL=http://localhost:9000/test
        builder = builder.add_source(
            Environment::with_prefix("STAMPEDE")
                .separator("__")
                .try_parsing(true),
        );

        let config: StampedeConfig = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> StampedeResult<Self> {
        let config: StampedeConfig = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> StampedeResult<()> {
        if self.scenario.target_url.is_empty() {
            return Err(StampedeError::invalid_runner("target_url cannot be empty"));
        }

        if self.scenario.tick_interval_ms == 0 {
            return Err(StampedeError::invalid_runner(
                "tick_interval_ms must be > 0",
            ));
        }

        // Both reject malformed input with their own diagnostics.
        LoadProfile::new(self.stages.clone())?;
        ThresholdSet::parse(&self.thresholds)?;

        Ok(())
    }

    /// Convert into the typed runner configuration.
    pub fn runner_config(&self) -> StampedeResult<RunnerConfig> {
        Ok(RunnerConfig {
            name: self.scenario.name.clone(),
            profile: LoadProfile::new(self.stages.clone())?,
            thresholds: ThresholdSet::parse(&self.thresholds)?,
            think_time: Duration::from_millis(self.scenario.think_time_ms),
            tick_interval: Duration::from_millis(self.scenario.tick_interval_ms),
        })
    }

    /// Per-request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.scenario.request_timeout_secs)
    }
}
