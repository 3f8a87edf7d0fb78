//! Job types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gpu::DeviceId;

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Process launched and not yet exited
    Running,
    /// Process exited, slot released
    Completed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// A command bound to the device it was admitted on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Job ID, used for log correlation only
    pub id: Uuid,
    /// Shell command line
    pub command: String,
    /// Device the job holds a slot on
    pub device: DeviceId,
    /// Current status
    pub status: JobStatus,
    /// Launch timestamp
    pub started_at: DateTime<Utc>,
    /// Exit timestamp
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a running job
    pub fn new(command: impl Into<String>, device: DeviceId) -> Self {
        Self {
            id: Uuid::new_v4(),
            command: command.into(),
            device,
            status: JobStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Mark the job as completed
    pub fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock run time, if the job has finished
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}
