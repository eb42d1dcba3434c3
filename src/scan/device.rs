//! Discovered device model.

use std::net::Ipv4Addr;
use std::time::SystemTime;

use indexmap::IndexMap;
use serde::Serialize;

/// Classification recorded for every device this scanner discovers; it
/// only ever finds Telnet-manageable screens.
pub const DEVICE_TYPE: &str = "telnet";

/// A device that accepted the credential pair during a scan.
///
/// Lives for the duration of one scan; the core holds no reference to it
/// after handing it to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    /// Address the login succeeded on.
    pub ip: Ipv4Addr,

    /// Identifier read from the device, `None` when the identification
    /// probe found nothing.
    pub device_id: Option<String>,

    /// Device classification, see [`DEVICE_TYPE`].
    pub device_type: String,

    /// When the login succeeded.
    pub discovered_at: SystemTime,
}

impl Device {
    /// Record a discovery at the current time.
    pub fn discovered(ip: Ipv4Addr, device_id: Option<String>) -> Self {
        Self {
            ip,
            device_id,
            device_type: DEVICE_TYPE.to_string(),
            discovered_at: SystemTime::now(),
        }
    }
}

/// Device collection keyed by ip, preserving discovery order.
///
/// Re-discovering an ip replaces the earlier entry in place
/// (last-write-wins), so the set never holds duplicates.
#[derive(Debug, Default)]
pub(crate) struct DeviceSet {
    devices: IndexMap<Ipv4Addr, Device>,
}

impl DeviceSet {
    pub fn upsert(&mut self, device: Device) {
        self.devices.insert(device.ip, device);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Deep, caller-safe copy for the progress channel.
    pub fn snapshot(&self) -> Vec<Device> {
        self.devices.values().cloned().collect()
    }

    pub fn into_vec(self) -> Vec<Device> {
        self.devices.into_values().collect()
    }
}
