use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use stampede_core::{
    HttpProbe, LoadRunner, Probe, ReportFormat, RunReport, StampedeConfig,
};

#[derive(Parser, Debug)]
#[command(name = "stampede")]
#[command(about = "HTTP burst load-testing tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a load scenario and evaluate its thresholds
    Run {
        /// Target URL, overriding the configured endpoint
        #[arg(long, env = "STAMPEDE_URL")]
        url: Option<String>,

        /// Scenario configuration file (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write a report to this file after the run
        #[arg(long)]
        report: Option<PathBuf>,

        /// Report format (markdown or json)
        #[arg(long, default_value = "markdown")]
        format: ReportFormat,
    },

    /// Generate a scenario configuration file
    GenerateConfig {
        /// Output configuration file path
        #[arg(long, default_value = "stampede.yaml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            url,
            config,
            report,
            format,
        } => {
            let mut config = match config {
                Some(path) => StampedeConfig::from_file(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => StampedeConfig::load().context("failed to load configuration")?,
            };

            if let Some(url) = url {
                config.scenario.target_url = url;
            }

            let runner_config = config.runner_config()?;
            let scenario_name = runner_config.name.clone();
            let thresholds = runner_config.thresholds.clone();

            println!("🚀 Starting load run: {}", scenario_name);
            println!("   Target: {}", config.scenario.target_url);
            println!("   Profile: {}", runner_config.profile.description());
            println!();

            let probe = HttpProbe::with_timeout(
                config.scenario.target_url.clone(),
                config.request_timeout(),
            )?;

            let runner = LoadRunner::new(runner_config);
            let metrics = runner.run(Arc::new(probe) as Arc<dyn Probe>).await?;

            let run_report = RunReport::new(scenario_name, metrics, &thresholds);
            print_summary(&run_report);

            if let Some(path) = report {
                run_report
                    .write_report(&path, format)
                    .with_context(|| format!("failed to write report {}", path.display()))?;
                println!("📝 Report written to: {}", path.display());
            }

            if !run_report.passes() {
                std::process::exit(1);
            }

            Ok(())
        }

        Commands::GenerateConfig { output } => {
            let template = config_template();
            std::fs::write(&output, template)
                .with_context(|| format!("failed to write {}", output.display()))?;

            println!("✅ Configuration template written to: {}", output.display());
            println!("\nEdit the file and use it with:");
            println!("  stampede run --config {}", output.display());

            Ok(())
        }
    }
}

fn print_summary(report: &RunReport) {
    let metrics = report.metrics();

    println!("\n=== Load Run Complete ===");
    println!("Total requests: {}", metrics.total_requests);
    println!("Successful: {}", metrics.successful_requests);
    println!("Failed: {}", metrics.failed_requests);
    println!("Failure rate: {:.2}%", metrics.failure_rate() * 100.0);
    println!(
        "P95 latency: {:.2}ms",
        metrics.p95_latency().as_secs_f64() * 1000.0
    );
    println!("Throughput: {:.1} req/s", metrics.throughput_rps());

    println!("\nChecks:");
    for (name, stats) in &metrics.checks {
        println!(
            "  {} {}: {}/{} passed",
            if stats.fails == 0 { "✅" } else { "❌" },
            name,
            stats.passes,
            stats.total()
        );
    }

    println!("\nThresholds:");
    for verdict in report.verdicts() {
        println!(
            "  {} {}: `{}` (observed {})",
            if verdict.passed { "✅" } else { "❌" },
            verdict.metric,
            verdict.expression,
            verdict.observed_display()
        );
    }

    if report.passes() {
        println!("\n✅ Run PASSED");
    } else {
        println!("\n❌ Run FAILED\n{}", report.failure_summary());
    }
}

fn config_template() -> &'static str {
    r#"# Stampede load scenario
#
# Ramp to 10,000 concurrent actors in 10s, hold for 60s, ramp back down.
# Each actor repeats: one GET against target_url, record the two checks,
# pause think_time_ms, go again.

scenario:
  name: connection-burst
  target_url: http://localhost:8080/test
  think_time_ms: 100
  request_timeout_secs: 30

stages:
  - duration: 10s
    target: 10000
  - duration: 60s
    target: 10000
  - duration: 10s
    target: 0

# Evaluated once, after the run. `rate<N` is a strict failed-request rate
# bound; `p(P)<N` bounds a latency percentile in milliseconds.
thresholds:
  http_req_failed:
    - rate<0.3
  http_req_duration:
    - p(95)<3000
"#
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_target(false).init();
}
