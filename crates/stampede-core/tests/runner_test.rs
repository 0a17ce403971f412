//! End-to-end runs against a local mock endpoint.
//!
//! Short profiles keep these CI-friendly; the full-scale burst profile is
//! exercised with `--ignored`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use stampede_core::checks::{NO_CONNECTION_ERROR, STATUS_IS_200};
use stampede_core::{
    HttpProbe, LoadProfile, LoadRunner, Probe, RunReport, RunnerConfig, Stage, ThresholdSet,
};

/// Serve `router` on an ephemeral port and return its address.
async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    addr
}

/// A port with nothing listening on it.
async fn refused_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn short_config() -> RunnerConfig {
    RunnerConfig {
        name: "smoke".to_string(),
        profile: LoadProfile::new(vec![
            Stage::new(Duration::from_millis(200), 5),
            Stage::new(Duration::from_millis(500), 5),
            Stage::new(Duration::from_millis(200), 0),
        ])
        .unwrap(),
        thresholds: ThresholdSet::default(),
        think_time: Duration::from_millis(10),
        tick_interval: Duration::from_millis(20),
    }
}

async fn run_against(url: String) -> (RunnerConfig, stampede_core::RunMetrics) {
    let config = short_config();
    let probe = HttpProbe::with_timeout(url, Duration::from_secs(2)).unwrap();
    let runner = LoadRunner::new(config.clone());
    let metrics = runner.run(Arc::new(probe) as Arc<dyn Probe>).await.unwrap();
    (config, metrics)
}

#[tokio::test]
async fn test_healthy_endpoint_passes_everything() {
    let router = Router::new().route(
        "/test",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            "Processed"
        }),
    );
    let addr = spawn_server(router).await;

    let (config, metrics) = run_against(format!("http://{}/test", addr)).await;

    assert!(metrics.total_requests > 0);
    assert_eq!(metrics.failed_requests, 0);

    // Every iteration passed both checks.
    let status = metrics.check(STATUS_IS_200);
    let connection = metrics.check(NO_CONNECTION_ERROR);
    assert_eq!(status.fails, 0);
    assert_eq!(connection.fails, 0);
    assert_eq!(status.total(), metrics.total_requests);

    let report = RunReport::new("smoke", metrics, &config.thresholds);
    assert!(report.passes());
}

#[tokio::test]
async fn test_refusing_endpoint_fails_run() {
    let port = refused_port().await;

    let (config, metrics) = run_against(format!("http://127.0.0.1:{}/test", port)).await;

    assert!(metrics.total_requests > 0);
    assert_eq!(metrics.failed_requests, metrics.total_requests);
    assert_eq!(metrics.failure_rate(), 1.0);

    // Connection failures fail both checks on every iteration.
    let status = metrics.check(STATUS_IS_200);
    let connection = metrics.check(NO_CONNECTION_ERROR);
    assert_eq!(status.passes, 0);
    assert_eq!(connection.passes, 0);

    // No response ever arrived, so there are no latency samples.
    assert!(metrics.latencies_us.is_empty());

    let report = RunReport::new("smoke", metrics, &config.thresholds);
    assert!(!report.passes());
    assert!(report.failure_summary().contains("http_req_failed"));
}

#[tokio::test]
async fn test_server_errors_fail_only_the_status_check() {
    let router = Router::new().route(
        "/test",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let addr = spawn_server(router).await;

    let (config, metrics) = run_against(format!("http://{}/test", addr)).await;

    assert!(metrics.total_requests > 0);

    // The connection worked every time; only the status assertion failed.
    let status = metrics.check(STATUS_IS_200);
    let connection = metrics.check(NO_CONNECTION_ERROR);
    assert_eq!(status.passes, 0);
    assert_eq!(connection.fails, 0);

    // 5xx responses count toward the failed-request rate, so the rate
    // threshold is violated while latency stays healthy.
    assert_eq!(metrics.failure_rate(), 1.0);
    let report = RunReport::new("smoke", metrics, &config.thresholds);
    assert!(!report.passes());
}

#[tokio::test]
async fn test_ramp_down_drains_cleanly() {
    // A probe slow enough that iterations are in flight when the final
    // stage hits target 0; they must still be recorded, not discarded.
    let router = Router::new().route(
        "/test",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            "Processed"
        }),
    );
    let addr = spawn_server(router).await;

    let (_, metrics) = run_against(format!("http://{}/test", addr)).await;

    assert!(metrics.total_requests > 0);
    assert_eq!(
        metrics.check(STATUS_IS_200).total(),
        metrics.total_requests,
        "every started iteration must be tallied exactly once"
    );
    assert_eq!(metrics.total_requests, metrics.latencies_us.len());
}

#[tokio::test]
#[ignore] // Run manually: cargo test burst -- --ignored
async fn test_full_burst_profile() {
    let router = Router::new().route("/test", get(|| async { "Processed" }));
    let addr = spawn_server(router).await;

    let config = RunnerConfig {
        profile: LoadProfile::default(),
        ..short_config()
    };
    let probe = HttpProbe::new(format!("http://{}/test", addr)).unwrap();

    let metrics = LoadRunner::new(config.clone())
        .run(Arc::new(probe) as Arc<dyn Probe>)
        .await
        .unwrap();

    let report = RunReport::new("burst", metrics, &config.thresholds);
    assert!(report.passes());
}
