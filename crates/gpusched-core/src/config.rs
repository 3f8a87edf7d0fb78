//! Configuration types for gpusched

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{SchedError, SchedResult};
use crate::gpu::{find_duplicate_device, parse_device_list, DeviceId};

/// Environment variable CUDA programs read to restrict device visibility
pub const DEFAULT_DEVICE_ENV_VAR: &str = "CUDA_VISIBLE_DEVICES";

/// Default admission retry interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Device identifiers, in the order devices are tried
    pub devices: Vec<String>,
    /// Maximum concurrent jobs per device
    pub jobs_per_device: usize,
    /// Newline-delimited list of commands
    pub commands_file: Option<PathBuf>,
    /// Interval between admission attempts when every device is full
    pub poll_interval_ms: u64,
    /// Environment variable set to the chosen device for each job
    pub device_env_var: String,
    /// Shell used to run each command with `-c`
    pub shell: PathBuf,
    /// Wait for all launched jobs to exit before returning
    pub wait_for_jobs: bool,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            jobs_per_device: 1,
            commands_file: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            device_env_var: DEFAULT_DEVICE_ENV_VAR.to_string(),
            shell: PathBuf::from("sh"),
            wait_for_jobs: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> SchedResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SchedError::Config(format!("Failed to read config file: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| SchedError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Parsed device identifiers; entries may be comma-separated lists
    pub fn device_ids(&self) -> Vec<DeviceId> {
        parse_device_list(&self.devices)
    }

    /// Admission retry interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check the configuration before any dispatch begins
    pub fn validate(&self) -> SchedResult<()> {
        let devices = self.device_ids();
        if devices.is_empty() {
            return Err(SchedError::Config("no GPUs given".to_string()));
        }
        if let Some(device) = find_duplicate_device(&devices) {
            return Err(SchedError::Config(format!(
                "GPU {} is listed more than once",
                device
            )));
        }

        if self.jobs_per_device == 0 {
            return Err(SchedError::Config(
                "jobs per GPU must be at least 1".to_string(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(SchedError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        if self.device_env_var.is_empty() || self.device_env_var.contains('=') {
            return Err(SchedError::Config(format!(
                "invalid device environment variable name: {:?}",
                self.device_env_var
            )));
        }

        match &self.commands_file {
            None => Err(SchedError::Config("no commands file given".to_string())),
            Some(path) if !path.is_file() => Err(SchedError::Config(format!(
                "could not find commands file {}",
                path.display()
            ))),
            Some(_) => Ok(()),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
