//! Launcher trait definitions

use async_trait::async_trait;
use gpusched_core::{DeviceId, Job, SchedError, SchedResult};
use tokio::task::JoinHandle;

/// Launcher trait for starting admitted jobs
///
/// The caller has already reserved a slot on `device`. The launcher owns that
/// reservation from then on: it must release it exactly once, either when the
/// job exits or right away if the job cannot be started.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start `command` bound to `device` without waiting for it to exit
    async fn launch(&self, command: &str, device: DeviceId) -> SchedResult<JobHandle>;

    /// Get the launcher name
    fn name(&self) -> &'static str;
}

/// Handle to a launched job
///
/// Dropping the handle detaches the job; its slot is still released when it
/// exits.
#[derive(Debug)]
pub struct JobHandle {
    job: Job,
    completion: JoinHandle<Job>,
}

impl JobHandle {
    /// Wrap a running job and the task that observes its completion
    pub fn new(job: Job, completion: JoinHandle<Job>) -> Self {
        Self { job, completion }
    }

    /// The job as it was launched
    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Wait for the job to exit and its slot to be released
    pub async fn wait(self) -> SchedResult<Job> {
        self.completion.await.map_err(|e| {
            SchedError::Internal(format!(
                "completion task for job {} failed: {}",
                self.job.id, e
            ))
        })
    }
}
