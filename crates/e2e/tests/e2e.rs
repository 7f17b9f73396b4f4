//! E2E test harness entry point
//!
//! This file is the test binary that runs banking flow suites from YAML specs
//! against the simulated bank.
//! Run with: cargo test --package bankflow-e2e --test e2e

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use bankflow_e2e::{CaseFilter, HarnessConfig, SimConfig, SimSessions, SuiteRunner, SuiteSpec};

#[derive(Parser, Debug)]
#[command(name = "bankflow-e2e")]
#[command(about = "Banking flow verification harness")]
struct Args {
    /// Harness configuration file (TOML)
    #[arg(short, long, default_value = "bankflow.toml")]
    config: PathBuf,

    /// Path to suite specs directory (overrides config)
    #[arg(short, long)]
    specs: Option<PathBuf>,

    /// Fixture file (overrides config)
    #[arg(short, long)]
    fixtures: Option<PathBuf>,

    /// Run only cases matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific case by name
    #[arg(short, long)]
    name: Option<String>,

    /// Milliseconds before a confirmed transaction shows in the history
    #[arg(long, default_value = "1500")]
    history_lag_ms: u64,

    /// Milliseconds before a newly opened page renders
    #[arg(long, default_value = "0")]
    render_lag_ms: u64,

    /// Output directory for results (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> anyhow::Result<bool> {
    let mut config = HarnessConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(specs) = args.specs {
        config.specs_dir = specs;
    }
    if let Some(fixtures) = args.fixtures {
        config.fixtures = Some(fixtures);
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }

    let sim = SimConfig {
        credentials: config.credentials.clone(),
        history_lag: Duration::from_millis(args.history_lag_ms),
        render_lag: Duration::from_millis(args.render_lag_ms),
        ..Default::default()
    };
    let runner = SuiteRunner::from_config(&config, SimSessions::shared(sim))?;

    let cancel = runner.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight verifications");
            cancel.cancel();
        }
    });

    let filter = CaseFilter {
        tag: args.tag,
        name: args.name,
    };

    let results = if config.specs_dir.is_dir() {
        runner
            .run_all(&config.specs_dir, &filter)
            .await
            .with_context(|| format!("running suites in {}", config.specs_dir.display()))?
    } else {
        tracing::info!(
            "No specs at {}, running the built-in suite",
            config.specs_dir.display()
        );
        runner.run_specs(&[SuiteSpec::builtin()], &filter).await
    };

    runner.write_results(&results)?;

    Ok(results.success())
}
