//! Instrumentation device discovery via the frida CLI
//!
//! Ships the [`DeviceEnumerator`] implementation used by the binary: it
//! runs `frida-ls-devices` and parses the id/type columns. Unlike the adb
//! side, failures here are not recovered; without this listing no local
//! device can ever be reconciled, so errors propagate and stop the loop.

use super::scanner::DeviceEnumerator;
use super::{DeviceKind, RawDevice};
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Enumerator backed by the `frida-ls-devices` command.
#[derive(Debug, Clone)]
pub struct FridaCliEnumerator {
    program: String,
}

impl FridaCliEnumerator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FridaCliEnumerator {
    fn default() -> Self {
        Self::new("frida-ls-devices")
    }
}

#[async_trait]
impl DeviceEnumerator for FridaCliEnumerator {
    async fn list(&self) -> Result<Vec<RawDevice>> {
        let output = tokio::process::Command::new(&self.program)
            .output()
            .await
            .with_context(|| format!("failed to run device listing ({})", self.program))?;

        if !output.status.success() {
            anyhow::bail!(
                "device listing ({}) exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        parse_listing(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `frida-ls-devices` output into raw device records.
///
/// The output is a column table: a header line, a dashed separator, then
/// one device per line with the id and type in the first two columns.
/// Device names containing spaces sit in later columns and are ignored.
pub fn parse_listing(out: &str) -> Result<Vec<RawDevice>> {
    let mut past_separator = false;
    let mut devices = Vec::new();

    for line in out.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !past_separator {
            if trimmed.starts_with('-') {
                past_separator = true;
            }
            continue;
        }

        let mut fields = trimmed.split_whitespace();
        let (Some(id), Some(tag)) = (fields.next(), fields.next()) else {
            continue;
        };
        devices.push(RawDevice::new(id, DeviceKind::parse(tag)));
    }

    if !past_separator {
        anyhow::bail!("unrecognized device listing output (missing column header)");
    }

    Ok(devices)
}
