//! Process-based launcher
//!
//! Each job runs as `<shell> -c <command>` with the parent environment plus
//! the device variable. A spawned task waits for the process and returns the
//! slot to the slot table when it exits, whatever the exit status.

use async_trait::async_trait;
use gpusched_core::{
    DeviceId, Job, SchedError, SchedResult, SlotTable, DEFAULT_DEVICE_ENV_VAR,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::traits::{JobHandle, Launcher};

/// Process launcher configuration
#[derive(Debug, Clone)]
pub struct ProcessLauncherConfig {
    /// Shell that interprets each command line
    pub shell: PathBuf,
    /// Environment variable set to the device identifier
    pub device_env_var: String,
}

impl Default for ProcessLauncherConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("sh"),
            device_env_var: DEFAULT_DEVICE_ENV_VAR.to_string(),
        }
    }
}

/// Launches jobs as OS processes
pub struct ProcessLauncher {
    config: ProcessLauncherConfig,
    slots: Arc<SlotTable>,
}

impl ProcessLauncher {
    /// Create a new process launcher releasing slots into `slots`
    pub fn new(config: ProcessLauncherConfig, slots: Arc<SlotTable>) -> Self {
        Self { config, slots }
    }

    /// Build the command for a job
    fn build_command(&self, command: &str, device: &DeviceId) -> Command {
        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c").arg(command);
        cmd.env(&self.config.device_env_var, device.as_str());
        cmd
    }
}

/// Return a job's slot, logging bookkeeping faults
fn release_slot(slots: &SlotTable, device: &DeviceId) {
    if let Err(e) = slots.release(device) {
        error!(device = %device, error = %e, "Slot bookkeeping fault");
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, command: &str, device: DeviceId) -> SchedResult<JobHandle> {
        let job = Job::new(command, device);

        info!(
            job_id = %job.id,
            device = %job.device,
            command = %job.command,
            "Starting job"
        );

        let mut child = match self.build_command(command, &job.device).spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(
                    job_id = %job.id,
                    device = %job.device,
                    error = %e,
                    "Failed to spawn job"
                );
                release_slot(&self.slots, &job.device);
                return Err(SchedError::Launch(format!(
                    "failed to spawn `{}`: {}",
                    command, e
                )));
            }
        };

        debug!(job_id = %job.id, pid = ?child.id(), "Job process spawned");

        let slots = Arc::clone(&self.slots);
        let mut finished = job.clone();
        let completion = tokio::spawn(async move {
            let exit_code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!(
                        job_id = %finished.id,
                        error = %e,
                        "Failed to wait for job"
                    );
                    None
                }
            };

            release_slot(&slots, &finished.device);
            finished.complete();
            debug!(
                job_id = %finished.id,
                device = %finished.device,
                exit_code = ?exit_code,
                elapsed_ms = finished.elapsed().map(|d| d.num_milliseconds()),
                "Job exited"
            );
            finished
        });

        Ok(JobHandle::new(job, completion))
    }

    fn name(&self) -> &'static str {
        "process"
    }
}
