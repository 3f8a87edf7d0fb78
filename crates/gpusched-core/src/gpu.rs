//! GPU device identifiers

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Opaque identifier of a GPU device, e.g. `"0"`.
///
/// The identifier is passed verbatim to launched commands through the
/// device environment variable, so it is kept as the string the user supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Parse device identifiers from command-line style entries
///
/// Each entry may itself be a comma-separated list, so `["0,1", "2"]` and
/// `["0", "1", "2"]` yield the same devices. Whitespace around identifiers
/// and empty fragments are dropped. Order is preserved and duplicates are
/// kept, so that validation can reject them.
pub fn parse_device_list<S: AsRef<str>>(entries: &[S]) -> Vec<DeviceId> {
    entries
        .iter()
        .flat_map(|entry| entry.as_ref().split(','))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(DeviceId::from)
        .collect()
}

/// First device that appears more than once, in list order
pub fn find_duplicate_device(devices: &[DeviceId]) -> Option<&DeviceId> {
    let mut seen = HashSet::with_capacity(devices.len());
    devices.iter().find(|device| !seen.insert(*device))
}
