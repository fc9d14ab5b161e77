//! Argus - keeps one monitoring session per attached device
//!
//! This library crate exposes internal modules for integration testing.

pub mod config;
pub mod devices;
pub mod registry;
pub mod session;
pub mod watch;
