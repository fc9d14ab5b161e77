//! Unified endpoint scan combining the two device sources
//!
//! One scan produces the deduplicated endpoint set the reconciler works
//! on. The instrumentation listing is authoritative for usb devices and a
//! failure there is fatal; the adb listing fills in remote devices and is
//! allowed to fail quietly.

use super::adb::AdbCli;
use super::{merge_device_sources, Device, DeviceKind, RawDevice};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of the instrumentation-side device listing.
///
/// Implementations may fail; the scan propagates those failures instead
/// of recovering, since continuing without this listing would reconcile
/// against an incomplete endpoint set.
#[async_trait]
pub trait DeviceEnumerator: Send + Sync {
    /// Current devices as the instrumentation API reports them.
    async fn list(&self) -> Result<Vec<RawDevice>>;
}

/// Combines the instrumentation and adb listings into one endpoint set.
pub struct DeviceScanner {
    enumerator: Arc<dyn DeviceEnumerator>,
    adb: AdbCli,
}

impl DeviceScanner {
    pub fn new(enumerator: Arc<dyn DeviceEnumerator>, adb: AdbCli) -> Self {
        Self { enumerator, adb }
    }

    /// Produce the current deduplicated endpoint set.
    ///
    /// Usb-tagged entries of the instrumentation listing become usb
    /// endpoints; serials only adb knows about become remote endpoints.
    /// A serial present in both listings stays usb, see
    /// [`merge_device_sources`].
    pub async fn scan(&self) -> Result<Vec<Device>> {
        let raw = self.enumerator.list().await?;
        let usb_devices: Vec<Device> = raw
            .into_iter()
            .filter(|d| d.kind == DeviceKind::Usb)
            .map(|d| Device::usb(d.id))
            .collect();

        let serials = self.adb.serials().await;

        Ok(merge_device_sources(usb_devices, serials))
    }
}
