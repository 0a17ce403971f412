//! Actor scheduling: scales a pool of probe loops to follow a load profile.

use crate::error::{StampedeError, StampedeResult};
use crate::metrics::{MetricsCollector, RunMetrics};
use crate::probe::Probe;
use crate::profile::LoadProfile;
use crate::thresholds::ThresholdSet;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Pause between a probe's completion and the actor's next iteration.
pub const DEFAULT_THINK_TIME: Duration = Duration::from_millis(100);

/// How often the supervisor reconciles the actor pool against the profile.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for one load run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Scenario name, used in logs and reports.
    pub name: String,

    /// Staged ramp the actor pool follows.
    pub profile: LoadProfile,

    /// Thresholds evaluated against the finished run.
    pub thresholds: ThresholdSet,

    /// Pause at the end of every iteration.
    pub think_time: Duration,

    /// Supervisor reconciliation interval.
    pub tick_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            name: "connection-burst".to_string(),
            profile: LoadProfile::default(),
            thresholds: ThresholdSet::default(),
            think_time: DEFAULT_THINK_TIME,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// One live actor: its stop signal and its task handle.
struct ActorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ActorHandle {
    fn signal_stop(&self) {
        // The receiver half only disappears once the task has exited.
        let _ = self.stop.send(true);
    }
}

/// Drives a probe according to a [`RunnerConfig`].
pub struct LoadRunner {
    config: RunnerConfig,
}

impl LoadRunner {
    /// Create a runner for the given configuration.
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// The configuration this runner executes.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run the load profile to completion and return the aggregate metrics.
    ///
    /// The supervisor re-reads the profile every tick and scales the actor
    /// pool to match. Stopping is cooperative: a stopped actor finishes its
    /// in-flight iteration and records it before exiting, so a ramp-down to
    /// 0 never discards work.
    pub async fn run(&self, probe: Arc<dyn Probe>) -> StampedeResult<RunMetrics> {
        if self.config.tick_interval.is_zero() {
            return Err(StampedeError::invalid_runner("tick interval must be non-zero"));
        }

        info!(
            scenario = %self.config.name,
            profile = %self.config.profile.description(),
            max_actors = self.config.profile.max_target(),
            "starting load run"
        );

        let collector = Arc::new(RwLock::new(MetricsCollector::new()));
        let total_duration = self.config.profile.total_duration();
        let start = Instant::now();

        let mut actors: Vec<ActorHandle> = Vec::new();
        let mut drained: Vec<ActorHandle> = Vec::new();

        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_progress = Duration::ZERO;

        loop {
            ticker.tick().await;

            let elapsed = start.elapsed();
            if elapsed >= total_duration {
                break;
            }

            let target = self.config.profile.target_at(elapsed) as usize;

            if target > actors.len() {
                for _ in actors.len()..target {
                    actors.push(self.spawn_actor(Arc::clone(&probe), Arc::clone(&collector)));
                }
            } else {
                // Ramp-down: tell the newest actors to stop after their
                // current iteration, and join them at run end.
                while actors.len() > target {
                    if let Some(actor) = actors.pop() {
                        actor.signal_stop();
                        drained.push(actor);
                    }
                }
            }

            if elapsed - last_progress >= PROGRESS_INTERVAL {
                last_progress = elapsed;
                let snapshot = collector.read().snapshot();
                info!(
                    elapsed_secs = elapsed.as_secs(),
                    actors = actors.len(),
                    requests = snapshot.total_requests,
                    p95_ms = snapshot.p95_latency().as_secs_f64() * 1000.0,
                    failure_rate = snapshot.failure_rate(),
                    "load run progress"
                );
            }
        }

        // Profile complete: stop everything, then wait for in-flight
        // iterations to finish.
        for actor in &actors {
            actor.signal_stop();
        }
        debug!(draining = actors.len() + drained.len(), "ramp complete, draining actors");

        for actor in actors.into_iter().chain(drained) {
            let _ = actor.task.await;
        }

        let metrics = collector.read().snapshot();
        info!(
            scenario = %self.config.name,
            total_requests = metrics.total_requests,
            failed_requests = metrics.failed_requests,
            failure_rate = metrics.failure_rate(),
            p95_ms = metrics.p95_latency().as_secs_f64() * 1000.0,
            "load run complete"
        );

        Ok(metrics)
    }

    fn spawn_actor(
        &self,
        probe: Arc<dyn Probe>,
        collector: Arc<RwLock<MetricsCollector>>,
    ) -> ActorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let think_time = self.config.think_time;

        let task = tokio::spawn(actor_loop(probe, collector, think_time, stop_rx));

        ActorHandle {
            stop: stop_tx,
            task,
        }
    }
}

/// One actor's iteration loop: probe, record, pause, repeat until stopped.
async fn actor_loop(
    probe: Arc<dyn Probe>,
    collector: Arc<RwLock<MetricsCollector>>,
    think_time: Duration,
    mut stop: watch::Receiver<bool>,
) {
    while !*stop.borrow() {
        let result = probe.run().await;
        collector.write().record(&result);

        // The pause closes the iteration; only it is cut short on stop,
        // never the probe itself.
        tokio::select! {
            _ = tokio::time::sleep(think_time) => {}
            _ = stop.changed() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeOutcome, ProbeResult};
    use crate::profile::Stage;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Probe that answers 200 after a fixed delay.
    struct FixedProbe {
        delay: Duration,
        invocations: AtomicUsize,
    }

    impl FixedProbe {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                invocations: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Probe for FixedProbe {
        async fn run(&self) -> ProbeResult {
            self.invocations.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(self.delay).await;
            ProbeResult {
                outcome: ProbeOutcome::Response {
                    status: StatusCode::OK,
                },
                latency: self.delay,
            }
        }
    }

    fn short_config() -> RunnerConfig {
        RunnerConfig {
            name: "test".to_string(),
            profile: LoadProfile::new(vec![
                Stage::new(Duration::from_millis(200), 4),
                Stage::new(Duration::from_millis(400), 4),
                Stage::new(Duration::from_millis(200), 0),
            ])
            .unwrap(),
            think_time: Duration::from_millis(10),
            tick_interval: Duration::from_millis(20),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_executes_probe_and_collects() {
        let probe = Arc::new(FixedProbe::new(Duration::from_millis(1)));
        let runner = LoadRunner::new(short_config());

        let metrics = runner.run(Arc::clone(&probe) as Arc<dyn Probe>).await.unwrap();

        assert!(metrics.total_requests > 0);
        assert_eq!(metrics.failed_requests, 0);
        // Every invocation was recorded, including in-flight ones at stop.
        assert_eq!(metrics.total_requests, probe.invocations.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_zero_tick_interval_is_rejected() {
        let config = RunnerConfig {
            tick_interval: Duration::ZERO,
            ..short_config()
        };

        let probe = Arc::new(FixedProbe::new(Duration::from_millis(1)));
        let result = LoadRunner::new(config).run(probe as Arc<dyn Probe>).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_slow_probe_finishes_before_run_returns() {
        // Probe slower than the whole profile: the single iteration per
        // actor must still complete and be recorded.
        let probe = Arc::new(FixedProbe::new(Duration::from_millis(300)));
        let config = RunnerConfig {
            profile: LoadProfile::new(vec![
                Stage::new(Duration::from_millis(50), 2),
                Stage::new(Duration::from_millis(100), 2),
            ])
            .unwrap(),
            think_time: Duration::from_millis(1),
            tick_interval: Duration::from_millis(20),
            ..RunnerConfig::default()
        };

        let metrics = LoadRunner::new(config)
            .run(Arc::clone(&probe) as Arc<dyn Probe>)
            .await
            .unwrap();

        assert_eq!(metrics.total_requests, probe.invocations.load(Ordering::Relaxed));
        assert!(metrics.total_requests >= 2);
    }
}
