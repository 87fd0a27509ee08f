//! Scenario replay entry point
//!
//! Reports go to stdout, one JSON object per line; logs go to stderr.

use anyhow::{bail, Context, Result};
use clap::Parser;
use simulator::{Engines, Scenario};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/ballast.toml")]
    config: PathBuf,

    /// Environment overlay under config/environments/
    #[arg(short, long)]
    env: Option<String>,

    /// Scenario file to replay
    #[arg(short, long, required_unless_present = "print_config")]
    scenario: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Emit logs as JSON (overrides the configured setting)
    #[arg(long)]
    json_logs: bool,

    /// Exit with an error if any step was rejected
    #[arg(long)]
    fail_on_reject: bool,
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = config::load_config(Some(args.config.as_path()), args.env.as_deref())
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))?;
    init_logging(
        &config.global.log_level,
        args.json_logs || config.global.json_logs,
    );

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    info!("Starting Ballast simulator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let Some(scenario_path) = args.scenario else {
        bail!("--scenario is required");
    };
    let scenario = Scenario::load(&scenario_path)?;
    info!(
        steps = scenario.steps.len(),
        start = scenario.start,
        "Scenario loaded: {:?}",
        scenario_path
    );

    let mut engines = Engines::from_config(&config, scenario.start)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut rejected = 0usize;
    for (index, step) in scenario.steps.iter().enumerate() {
        let report = engines.run(index, step);
        if !report.is_ok() {
            rejected += 1;
        }
        writeln!(out, "{}", serde_json::to_string(&report)?)
            .context("Failed to write report")?;
    }

    info!(
        applied = scenario.steps.len() - rejected,
        rejected, "Replay finished"
    );

    if args.fail_on_reject && rejected > 0 {
        bail!("{} of {} steps rejected", rejected, scenario.steps.len());
    }
    Ok(())
}
