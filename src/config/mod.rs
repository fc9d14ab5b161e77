use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub frida: FridaConfig,
    #[serde(default)]
    pub adb: AdbConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Poll interval between device scans.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub install: bool,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub spawn: bool,
    /// Process name patterns handed to every session.
    #[serde(default)]
    pub patterns: Vec<String>,
}

fn default_interval_ms() -> u64 {
    100
}

fn default_port() -> u16 {
    27042
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            install: false,
            port: default_port(),
            spawn: false,
            patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FridaConfig {
    #[serde(default = "default_frida_program")]
    pub program: String,
}

fn default_frida_program() -> String {
    "frida-ls-devices".to_string()
}

impl Default for FridaConfig {
    fn default() -> Self {
        Self {
            program: default_frida_program(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdbConfig {
    #[serde(default = "default_adb_program")]
    pub program: String,
}

fn default_adb_program() -> String {
    "adb".to_string()
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            program: default_adb_program(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker command spawned per device; without one the loop can
    /// only be observed, not told what to run, so `main` requires it.
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

pub fn config_dir() -> Result<PathBuf> {
    let dir = directories::ProjectDirs::from("", "", "argus")
        .context("Could not determine config directory")?
        .config_dir()
        .to_path_buf();
    Ok(dir)
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration.
///
/// An explicitly given path must exist; the default path is optional
/// and falls back to built-in defaults when absent.
pub fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("Config file not found at {}", p.display());
            }
            read_config(p)
        }
        None => {
            let p = default_config_path()?;
            if p.exists() {
                read_config(&p)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;

    Ok(config)
}

/// Compile the configured process patterns, rejecting invalid ones up
/// front rather than at session start.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("Invalid process pattern '{}'", p)))
        .collect()
}
