//! Remote device discovery via the adb CLI
//!
//! Runs `adb devices` and parses serials out of its stdout. adb is the
//! tolerant source: a missing binary, a failing command, or unparsable
//! output all mean "no remote devices" for the current cycle; the next
//! tick retries naturally.

/// Wrapper around the fixed `adb devices` listing command.
#[derive(Debug, Clone)]
pub struct AdbCli {
    program: String,
}

impl AdbCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run the listing command and return every serial it reported.
    ///
    /// Never fails: command errors and non-zero exits are logged at debug
    /// level and treated as an empty listing.
    pub async fn serials(&self) -> Vec<String> {
        let output = match tokio::process::Command::new(&self.program)
            .arg("devices")
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!("adb listing failed to run ({}): {}", self.program, e);
                return Vec::new();
            }
        };

        if !output.status.success() {
            tracing::debug!("adb listing exited with {}", output.status);
            return Vec::new();
        }

        parse_serials(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for AdbCli {
    fn default() -> Self {
        Self::new("adb")
    }
}

/// Parse `adb devices` output into a list of serials.
///
/// The first line is the `List of devices attached` header; each remaining
/// non-empty line is one entry whose serial is the first whitespace- or
/// tab-delimited field. Device state suffixes (`device`, `offline`,
/// `unauthorized`) are ignored.
pub fn parse_serials(out: &str) -> Vec<String> {
    out.lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(|serial| serial.to_string())
        .collect()
}
