//! First-fit GPU allocator

use gpusched_core::{DeviceId, SlotTable};
use std::sync::Arc;
use tracing::{debug, error};

/// Picks and reserves a device with a free slot
///
/// Devices are always scanned in declaration order, so low-indexed devices
/// fill up first and later ones only receive work once earlier ones are full.
#[derive(Debug, Clone)]
pub struct Allocator {
    slots: Arc<SlotTable>,
}

impl Allocator {
    /// Create an allocator over `slots`
    pub fn new(slots: Arc<SlotTable>) -> Self {
        Self { slots }
    }

    /// The slot table this allocator reserves from
    pub fn slots(&self) -> &Arc<SlotTable> {
        &self.slots
    }

    /// Reserve a slot on the first device under capacity
    ///
    /// Selection and reservation happen together, so concurrent callers can
    /// never both take the last slot of a device. Returns `None` when every
    /// device is full.
    pub fn find_available_device(&self) -> Option<DeviceId> {
        for device in self.slots.devices() {
            match self.slots.try_reserve(device) {
                Ok(true) => return Some(device.clone()),
                Ok(false) => {}
                Err(e) => {
                    // The scan only visits devices owned by the table.
                    error!(device = %device, error = %e, "Slot table rejected its own device");
                }
            }
        }

        debug!(
            running = self.slots.total_load(),
            capacity = self.slots.total_capacity(),
            loads = ?self.slots.snapshot(),
            "No GPU is available"
        );
        None
    }
}
