//! Session plumbing: settings, typed errors, and supervised handles
//!
//! A monitoring session runs as an independent task per device. The loop
//! only ever sees a [`SessionHandle`]: start it once, query liveness
//! without blocking, request cancellation without waiting. What the
//! session actually does is the factory's business.

pub mod command;

pub use command::CommandSessionFactory;

use crate::devices::Device;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Session configuration fixed at loop construction and passed through to
/// the factory unchanged for every created session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Provision the device-side agent before attaching.
    pub install: bool,
    /// Port used when connecting to remote devices.
    pub port: u16,
    /// Name filters selecting which targets the session instruments.
    pub patterns: Vec<Regex>,
    /// Spawn targets instead of attaching to running ones.
    pub spawn: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            install: false,
            port: 27042,
            patterns: Vec::new(),
            spawn: false,
        }
    }
}

/// Typed initialization error reported by session factories.
///
/// Creation failures are recovered per endpoint: the reconciler logs the
/// error, skips the device for this tick, and retries next tick while the
/// device remains enumerable.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configured worker binary is not installed or not on PATH.
    #[error("worker binary not found: {program}")]
    WorkerNotFound { program: String },

    /// The worker process could not be spawned for this device.
    #[error("failed to spawn worker for {device}: {source}")]
    Spawn {
        device: String,
        #[source]
        source: std::io::Error,
    },

    /// The device is incompatible or unreachable.
    #[error("device {device} rejected the session: {reason}")]
    Rejected { device: String, reason: String },
}

type SessionFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Handle to one monitoring session.
///
/// Created in a pending state; [`start`](Self::start) spawns the session
/// body as a task raced against the handle's cancellation token, so a
/// cancel lands at the body's next await point. Liveness is a read-only
/// check on the task and is safe to call while the session runs.
pub struct SessionHandle {
    device: Device,
    cancel: CancellationToken,
    started_at: Option<DateTime<Utc>>,
    body: Option<SessionFuture>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("device", &self.device)
            .field("started_at", &self.started_at)
            .field("pending", &self.body.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub fn new(device: Device, body: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            device,
            cancel: CancellationToken::new(),
            started_at: None,
            body: Some(Box::pin(body)),
            task: None,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Clone of the session's cancellation token, for bodies that want
    /// their own cooperative checkpoints.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// When the session began executing, if it has.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Begin the session's own execution. Starting twice is a no-op.
    pub fn start(&mut self) {
        let Some(body) = self.body.take() else {
            return;
        };

        let token = self.cancel.clone();
        let device_id = self.device.id.clone();
        self.started_at = Some(Utc::now());
        self.task = Some(tokio::spawn(async move {
            tokio::select! {
                _ = body => {
                    tracing::debug!("session for {} finished", device_id);
                }
                _ = token.cancelled() => {
                    tracing::debug!("session for {} cancelled", device_id);
                }
            }
        }));
    }

    /// Whether the session task is still executing.
    ///
    /// A handle that was never started reports not alive.
    pub fn is_alive(&self) -> bool {
        match &self.task {
            Some(task) => !task.is_finished(),
            None => false,
        }
    }

    /// Request cancellation. Advisory and idempotent: the session observes
    /// it at its next await point; this call never blocks on task exit.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Creates monitoring sessions for devices the reconciler wants covered.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Initialize a session for one device.
    ///
    /// Performs the device-facing setup that can fail (worker resolution,
    /// attach checks) and returns a handle that is not yet running; the
    /// reconciler inserts the handle into its table before calling
    /// [`SessionHandle::start`].
    async fn create(
        &self,
        device: &Device,
        settings: &SessionSettings,
    ) -> Result<SessionHandle, SessionError>;
}
