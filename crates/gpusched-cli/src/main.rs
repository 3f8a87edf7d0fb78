//! gpusched CLI
//!
//! Runs every command from a commands file on a pool of GPUs, keeping at most
//! `--jobs-per-gpu` commands running on each GPU.

mod commands;

use anyhow::Context;
use clap::Parser;
use gpusched_core::{SchedResult, SchedulerConfig};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// gpusched - run a list of commands on a pool of GPUs
#[derive(Parser, Debug)]
#[command(name = "gpusched")]
#[command(version, about, long_about = None)]
struct Cli {
    /// GPU ids to use, separated by spaces or commas (e.g. `0 1` or `0,1`)
    #[arg(long, num_args = 1..)]
    gpus: Vec<String>,

    /// File with one command per line
    #[arg(long, alias = "commands_file")]
    commands_file: Option<PathBuf>,

    /// Maximum number of concurrent jobs per GPU
    #[arg(long, alias = "jobs_per_gpu")]
    jobs_per_gpu: Option<usize>,

    /// Milliseconds between admission attempts while all GPUs are busy
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Environment variable set to the assigned GPU id
    #[arg(long)]
    device_env_var: Option<String>,

    /// Shell used to run each command
    #[arg(long)]
    shell: Option<PathBuf>,

    /// TOML configuration file; command-line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exit once every command is launched instead of waiting for them
    #[arg(long)]
    no_wait: bool,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Merge the optional config file with command-line flags
    fn into_config(self) -> SchedResult<SchedulerConfig> {
        let mut config = match &self.config {
            Some(path) => SchedulerConfig::from_file(path)?,
            None => SchedulerConfig::default(),
        };

        if !self.gpus.is_empty() {
            config.devices = self.gpus;
        }
        if let Some(path) = self.commands_file {
            config.commands_file = Some(path);
        }
        if let Some(jobs) = self.jobs_per_gpu {
            config.jobs_per_device = jobs;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(var) = self.device_env_var {
            config.device_env_var = var;
        }
        if let Some(shell) = self.shell {
            config.shell = shell;
        }
        if self.no_wait {
            config.wait_for_jobs = false;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }

        Ok(config)
    }
}

/// Install the global subscriber; RUST_LOG wins over `level`
fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;
    init_logging(&config.logging.level)?;

    commands::run(config).await
}
