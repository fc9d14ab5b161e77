//! Merging logic for combining the two device listings
//!
//! Pure function for merging the instrumentation (usb) listing with the
//! adb serial listing. Usb entries win: a serial present in both listings
//! yields exactly one usb device, never a remote one.

use super::Device;
use std::collections::HashSet;

/// Merge usb devices and adb serials into one deduplicated endpoint list.
///
/// Usb devices are listed first in listing order, followed by one
/// remote device per adb serial that no usb device already claims.
/// Duplicate ids are removed so the reconciler never sees the same
/// endpoint twice.
///
/// # Arguments
/// * `usb_devices` - Devices the instrumentation listing tagged as usb
/// * `adb_serials` - Serials parsed from `adb devices` output
///
/// # Returns
/// Combined list with usb-first ordering and id deduplication
pub fn merge_device_sources(usb_devices: Vec<Device>, adb_serials: Vec<String>) -> Vec<Device> {
    let mut result = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for device in usb_devices {
        if seen_ids.insert(device.id.clone()) {
            result.push(device);
        }
    }

    // Serials not claimed by a usb device are reachable only remotely
    for serial in adb_serials {
        if seen_ids.insert(serial.clone()) {
            result.push(Device::remote(serial));
        }
    }

    result
}
