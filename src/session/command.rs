//! Session factory that supervises one worker process per device
//!
//! The monitoring work itself lives in an external worker binary; this
//! factory spawns it once per device and wraps the child in a session
//! task. The loop's construction parameters are passed on the worker's
//! command line:
//!
//! ```text
//! <program> [base args..] --device <id> --transport <usb|remote>
//!           --port <port> [--install] [--spawn] [--pattern <re>]..
//! ```
//!
//! Cancelling the session drops the supervising body, which kills the
//! child (`kill_on_drop`); a worker that exits on its own leaves a dead
//! session behind for the reconciler to heal on the next tick.

use super::{SessionError, SessionFactory, SessionHandle, SessionSettings};
use crate::devices::Device;
use async_trait::async_trait;
use std::process::Stdio;

/// Factory spawning a configurable worker command per device.
#[derive(Debug, Clone)]
pub struct CommandSessionFactory {
    program: String,
    base_args: Vec<String>,
}

impl CommandSessionFactory {
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }
}

#[async_trait]
impl SessionFactory for CommandSessionFactory {
    async fn create(
        &self,
        device: &Device,
        settings: &SessionSettings,
    ) -> Result<SessionHandle, SessionError> {
        let program = which::which(&self.program).map_err(|_| SessionError::WorkerNotFound {
            program: self.program.clone(),
        })?;

        let args = worker_args(&self.base_args, device, settings);
        tracing::debug!("spawning worker for {}: {:?} {:?}", device.id, program, args);

        let mut child = tokio::process::Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SessionError::Spawn {
                device: device.id.clone(),
                source,
            })?;

        let device_id = device.id.clone();
        let body = async move {
            match child.wait().await {
                Ok(status) => {
                    tracing::debug!("worker for {} exited with {}", device_id, status);
                }
                Err(e) => {
                    tracing::warn!("failed waiting on worker for {}: {}", device_id, e);
                }
            }
        };

        Ok(SessionHandle::new(device.clone(), body))
    }
}

/// Build the worker argument list for one device.
fn worker_args(base: &[String], device: &Device, settings: &SessionSettings) -> Vec<String> {
    let mut args: Vec<String> = base.to_vec();
    args.push("--device".to_string());
    args.push(device.id.clone());
    args.push("--transport".to_string());
    args.push(device.transport.label().to_string());
    args.push("--port".to_string());
    args.push(settings.port.to_string());
    if settings.install {
        args.push("--install".to_string());
    }
    if settings.spawn {
        args.push("--spawn".to_string());
    }
    for pattern in &settings.patterns {
        args.push("--pattern".to_string());
        args.push(pattern.as_str().to_string());
    }
    args
}
