//! Scheduler run command

use anyhow::{Context, Result};
use gpusched_core::{CommandQueue, SchedulerConfig, SlotTable};
use gpusched_runtime::{ProcessLauncher, ProcessLauncherConfig};
use gpusched_scheduler::{Allocator, Dispatcher};
use std::sync::Arc;
use tracing::{error, info};

/// Validate `config`, then launch every command and optionally wait for them
pub async fn run(config: SchedulerConfig) -> Result<()> {
    config.validate()?;

    let commands_file = config
        .commands_file
        .as_deref()
        .context("no commands file given")?;
    let queue = CommandQueue::from_file(commands_file)?;
    let slots = Arc::new(SlotTable::new(config.device_ids(), config.jobs_per_device)?);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        gpus = ?config.device_ids(),
        jobs_per_gpu = config.jobs_per_device,
        commands = queue.len(),
        "Starting gpusched"
    );

    let launcher = ProcessLauncher::new(
        ProcessLauncherConfig {
            shell: config.shell.clone(),
            device_env_var: config.device_env_var.clone(),
        },
        Arc::clone(&slots),
    );
    let dispatcher = Dispatcher::new(
        Allocator::new(Arc::clone(&slots)),
        Arc::new(launcher),
        config.poll_interval(),
    );

    let dispatched = dispatcher.run(&queue).await;

    if !config.wait_for_jobs {
        info!(
            running = slots.total_load(),
            "Exiting without waiting for running jobs"
        );
        return Ok(());
    }

    info!(jobs = dispatched.handles.len(), "Waiting for jobs to finish");
    for result in dispatched.join().await {
        if let Err(e) = result {
            error!(error = %e, "Job watcher failed");
        }
    }
    info!("All jobs finished");

    Ok(())
}
