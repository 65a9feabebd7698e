use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clap::ValueEnum;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tower_turnstile::Gate;
use turnstile::FixedWindow;
use turnstile::LimitConfig;
use turnstile::TokenBucket;

mod simulation;

use simulation::Report;
use simulation::Traffic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// 5 requests per 10s window, 3 workers, a request every 500ms
    FixedWindow,
    /// 5 token bucket refilled at 1/s, 2 workers, a request every 300ms
    TokenBucket,
    /// Both scenarios, one after the other
    All,
}

/// Drive turnstile strategies with simulated client traffic.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Built-in scenario to run
    #[arg(long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,

    /// YAML limit configuration to run instead of the built-in scenarios
    #[arg(long)]
    config: Option<PathBuf>,

    /// Client key for --config runs
    #[arg(long, default_value = "user123")]
    key: String,

    /// Worker threads for --config runs
    #[arg(long, default_value_t = 2)]
    workers: usize,

    /// Requests to submit for --config runs
    #[arg(long, default_value_t = 10)]
    requests: usize,

    /// Delay between requests for --config runs
    #[arg(long, default_value = "300ms", value_parser = humantime::parse_duration)]
    pace: Duration,
}

fn main() -> anyhow::Result<()> {
    // Allowed requests are logged at debug by the gate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_turnstile=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    if let Some(path) = &args.config {
        let config = LimitConfig::from_file(path)
            .with_context(|| format!("loading limit configuration from {}", path.display()))?;
        info!(?config, "Configuration loaded");

        let gate = Gate::from_config(&config)?;
        let traffic = Traffic {
            key: args.key.clone(),
            workers: args.workers,
            requests: args.requests,
            pace: args.pace,
        };
        let report = simulation::run(&gate, &traffic)?;
        summarize("configured", &report);
        return Ok(());
    }

    if matches!(args.scenario, Scenario::FixedWindow | Scenario::All) {
        run_fixed_window_demo("user123")?;
    }
    if matches!(args.scenario, Scenario::TokenBucket | Scenario::All) {
        run_token_bucket_demo("user456")?;
    }

    Ok(())
}

fn run_fixed_window_demo(key: &str) -> anyhow::Result<()> {
    info!("=== Fixed Window Demo ===");

    let gate = Gate::new(Arc::new(FixedWindow::new(5, Duration::from_secs(10))?));
    let traffic = Traffic {
        key: key.to_owned(),
        workers: 3,
        requests: 10,
        pace: Duration::from_millis(500),
    };

    let report = simulation::run(&gate, &traffic)?;
    summarize("fixed_window", &report);
    Ok(())
}

fn run_token_bucket_demo(key: &str) -> anyhow::Result<()> {
    info!("=== Token Bucket Demo ===");

    let gate = Gate::new(Arc::new(TokenBucket::new(5, 1.0)?));
    let traffic = Traffic {
        key: key.to_owned(),
        workers: 2,
        requests: 10,
        pace: Duration::from_millis(300),
    };

    let report = simulation::run(&gate, &traffic)?;
    summarize("token_bucket", &report);
    Ok(())
}

fn summarize(name: &str, report: &Report) {
    info!(
        scenario = name,
        admitted = report.admitted,
        rejected = report.rejected,
        p50_ns = report.latency.value_at_quantile(0.5),
        p99_ns = report.latency.value_at_quantile(0.99),
        "Simulation complete"
    );
}
