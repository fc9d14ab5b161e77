//! Device discovery for the watch loop
//!
//! Two overlapping listings are combined into one deduplicated endpoint
//! set: the instrumentation API's device list contributes the usb entries,
//! and the serials printed by `adb devices` contribute the remote entries.
//! A serial that shows up in both listings is a usb device.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       DeviceScanner                        │
//! │  ┌──────────────────┐      ┌──────────────────────────┐    │
//! │  │ DeviceEnumerator │      │          AdbCli          │    │
//! │  │ (instrumentation │      │      (adb devices)       │    │
//! │  │     listing)     │      │                          │    │
//! │  └────────┬─────────┘      └────────────┬─────────────┘    │
//! │           │ usb devices                 │ serials          │
//! │           └─────────────┬───────────────┘                  │
//! │                         │                                  │
//! │            merge_device_sources (pure)                     │
//! │                         │                                  │
//! │                    Vec<Device>                             │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod adb;
pub mod frida;
pub mod merger;
pub mod scanner;

pub use adb::AdbCli;
pub use frida::FridaCliEnumerator;
pub use merger::merge_device_sources;
pub use scanner::{DeviceEnumerator, DeviceScanner};

/// How a session reaches its device once created.
///
/// Informational only: session creation picks a connection strategy from
/// it, but identity and dedup never depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Usb,
    Remote,
}

impl Transport {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Usb => "usb",
            Self::Remote => "remote",
        }
    }
}

/// A deduplicated endpoint the reconciler tracks sessions against.
///
/// The session table keys endpoints by `id`; transport never affects
/// which endpoint an entry refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub transport: Transport,
}

impl Device {
    pub fn usb(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transport: Transport::Usb,
        }
    }

    pub fn remote(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transport: Transport::Remote,
        }
    }
}

/// Device type tag reported by the instrumentation listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Local,
    Usb,
    Remote,
}

impl DeviceKind {
    /// Parse the type column of an instrumentation listing.
    ///
    /// Unknown tags map to `Local` so they never enter the usb set.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "usb" => Self::Usb,
            "remote" => Self::Remote,
            _ => Self::Local,
        }
    }
}

/// One record from the instrumentation listing, before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDevice {
    pub id: String,
    pub kind: DeviceKind,
}

impl RawDevice {
    pub fn new(id: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_known_tags() {
        assert_eq!(DeviceKind::parse("usb"), DeviceKind::Usb);
        assert_eq!(DeviceKind::parse("remote"), DeviceKind::Remote);
        assert_eq!(DeviceKind::parse("local"), DeviceKind::Local);
    }

    #[test]
    fn unknown_tag_is_local() {
        assert_eq!(DeviceKind::parse("tether"), DeviceKind::Local);
        assert_eq!(DeviceKind::parse(""), DeviceKind::Local);
    }

    #[test]
    fn device_constructors_set_transport() {
        let d = Device::usb("emulator-5554");
        assert_eq!(d.id, "emulator-5554");
        assert_eq!(d.transport, Transport::Usb);

        let d = Device::remote("192.168.1.7:5555");
        assert_eq!(d.transport, Transport::Remote);
    }
}
