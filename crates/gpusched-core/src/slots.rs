//! Per-device slot accounting
//!
//! The slot table is the only state shared between the dispatch loop and the
//! job completion watchers. Every counter lives behind one mutex, which is
//! held only for the check-and-increment or the decrement and never across an
//! `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

use crate::error::{SchedError, SchedResult};
use crate::gpu::{find_duplicate_device, DeviceId};

/// Running-job counters for a fixed set of devices
#[derive(Debug)]
pub struct SlotTable {
    /// Devices in declaration order
    devices: Vec<DeviceId>,
    /// Uniform per-device capacity
    capacity: usize,
    /// Running jobs per device, indexed like `devices`
    loads: Mutex<Vec<usize>>,
    /// Signalled after every successful release
    released: Notify,
}

/// Load of a single device at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLoad {
    /// Device identifier
    pub device: DeviceId,
    /// Running jobs on the device
    pub running: usize,
    /// Maximum concurrent jobs on the device
    pub capacity: usize,
}

impl SlotTable {
    /// Create a slot table with `capacity` slots on each device
    ///
    /// Fails if the device list is empty, contains duplicates, or the
    /// capacity is zero.
    pub fn new(devices: Vec<DeviceId>, capacity: usize) -> SchedResult<Self> {
        if devices.is_empty() {
            return Err(SchedError::Config("device list is empty".to_string()));
        }
        if capacity == 0 {
            return Err(SchedError::Config(
                "jobs per device must be at least 1".to_string(),
            ));
        }
        if let Some(device) = find_duplicate_device(&devices) {
            return Err(SchedError::Config(format!(
                "device {} is listed more than once",
                device
            )));
        }

        let loads = Mutex::new(vec![0; devices.len()]);
        Ok(Self {
            devices,
            capacity,
            loads,
            released: Notify::new(),
        })
    }

    /// Devices in declaration order
    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    /// Capacity of a device
    pub fn capacity_for(&self, device: &DeviceId) -> SchedResult<usize> {
        self.position(device)?;
        Ok(self.capacity)
    }

    /// Total slots across all devices
    pub fn total_capacity(&self) -> usize {
        self.capacity * self.devices.len()
    }

    /// Running jobs on a device
    pub fn current_load(&self, device: &DeviceId) -> SchedResult<usize> {
        let idx = self.position(device)?;
        Ok(self.loads()[idx])
    }

    /// Running jobs across all devices
    pub fn total_load(&self) -> usize {
        self.loads().iter().sum()
    }

    /// Reserve a slot on `device` if it is under capacity
    ///
    /// Returns `Ok(false)` without changing anything when the device is full.
    pub fn try_reserve(&self, device: &DeviceId) -> SchedResult<bool> {
        let idx = self.position(device)?;
        let mut loads = self.loads();
        if loads[idx] >= self.capacity {
            return Ok(false);
        }
        loads[idx] += 1;
        debug!(device = %device, running = loads[idx], "Reserved slot");
        Ok(true)
    }

    /// Return a slot on `device`
    ///
    /// Releasing on a device with no running job is a bookkeeping fault and
    /// returns [`SchedError::SlotUnderflow`]; the count stays at zero.
    pub fn release(&self, device: &DeviceId) -> SchedResult<()> {
        let idx = self.position(device)?;
        {
            let mut loads = self.loads();
            if loads[idx] == 0 {
                return Err(SchedError::SlotUnderflow(device.to_string()));
            }
            loads[idx] -= 1;
            debug!(device = %device, running = loads[idx], "Released slot");
        }
        self.released.notify_one();
        Ok(())
    }

    /// Wait until a slot is released or `timeout` elapses
    ///
    /// Returns `true` if woken by a release. A release that happened while
    /// nobody was waiting wakes the next caller immediately.
    pub async fn wait_for_release(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.released.notified())
            .await
            .is_ok()
    }

    /// Current load of every device, in declaration order
    pub fn snapshot(&self) -> Vec<DeviceLoad> {
        let loads = self.loads();
        self.devices
            .iter()
            .zip(loads.iter())
            .map(|(device, &running)| DeviceLoad {
                device: device.clone(),
                running,
                capacity: self.capacity,
            })
            .collect()
    }

    fn position(&self, device: &DeviceId) -> SchedResult<usize> {
        self.devices
            .iter()
            .position(|d| d == device)
            .ok_or_else(|| SchedError::UnknownDevice(device.to_string()))
    }

    fn loads(&self) -> MutexGuard<'_, Vec<usize>> {
        // Counters are only mutated after all checks pass, so a poisoned
        // lock still holds consistent values.
        self.loads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
