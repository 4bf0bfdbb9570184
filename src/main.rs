mod collectors;
mod config;
mod http;
mod metrics;
mod output;
mod run;
mod snapshot;
#[cfg(test)]
mod testing;

use clap::Parser;
use config::{Config, ConfigError};
use metrics::Metrics;
use run::Runner;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sitestats")]
#[command(version, about = "Aggregates GoatCounter pageviews into a site data file")]
struct Cli {
    /// YAML config file; the built-in site list is used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Prometheus textfile to write after each run
    #[arg(long)]
    metrics_file: Option<PathBuf>,
    /// Keep running and refresh on this interval (e.g. "1h", "30m")
    #[arg(long, value_parser = humantime::parse_duration)]
    interval: Option<Duration>,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let metrics = if cfg.metrics_file.is_some() {
        match Metrics::new() {
            Ok(m) => Some(m),
            Err(err) => {
                error!(error = %err, "failed to initialise metrics");
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    info!(
        sources = cfg.sources.len(),
        output = %cfg.output.display(),
        "starting sitestats"
    );
    let runner = Runner::new(cfg, metrics);

    match cli.interval {
        None => {
            if let Err(err) = runner.run_once().await {
                error!(error = %err, "stats run failed");
                std::process::exit(1);
            }
        }
        Some(every) if every.is_zero() => {
            error!("--interval must be greater than zero");
            std::process::exit(1);
        }
        Some(every) => run_every(&runner, every).await,
    }
}

fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::builtin()?,
    };
    if let Some(output) = &cli.output {
        cfg.output = output.clone();
    }
    if let Some(metrics_file) = &cli.metrics_file {
        cfg.metrics_file = Some(metrics_file.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn run_every(runner: &Runner, every: Duration) {
    info!(interval = %humantime::format_duration(every), "running periodically");
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                if let Err(err) = res {
                    error!(error = %err, "failed to wait for Ctrl+C");
                }
                info!("received Ctrl+C, stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(err) = runner.run_once().await {
                    error!(error = %err, "stats run failed");
                }
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
