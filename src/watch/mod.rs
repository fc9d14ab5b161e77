//! The discovery-and-reconciliation loop
//!
//! One `WatchLoop` polls the device scanner on a fixed interval and
//! keeps exactly one monitoring session per live device: tracked and
//! alive is left alone, tracked but dead is replaced, untracked is
//! started. A device that drops out of the listing keeps its session
//! until the session dies on its own or the loop shuts down.
//!
//! The session table is owned by the loop task alone; nothing else
//! reads or writes it, so there is no locking around it.

use crate::devices::{Device, DeviceScanner};
use crate::registry::LoopRegistry;
use crate::session::{SessionFactory, SessionHandle, SessionSettings};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub struct WatchLoop {
    id: Uuid,
    scanner: DeviceScanner,
    factory: Arc<dyn SessionFactory>,
    settings: SessionSettings,
    interval: Duration,
    stop: CancellationToken,
    registry: LoopRegistry,
    sessions: HashMap<String, SessionHandle>,
}

impl WatchLoop {
    /// Create a loop and register it with the registry.
    ///
    /// The loop does not poll until [`run`](Self::run) or
    /// [`spawn`](Self::spawn) is called.
    pub async fn new(
        scanner: DeviceScanner,
        factory: Arc<dyn SessionFactory>,
        settings: SessionSettings,
        interval: Duration,
        registry: LoopRegistry,
    ) -> Self {
        let id = Uuid::new_v4();
        let stop = CancellationToken::new();
        registry.register(id, stop.clone()).await;
        Self {
            id,
            scanner,
            factory,
            settings,
            interval,
            stop,
            registry,
            sessions: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Token observed at every tick boundary; cancel it to stop the loop.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_tracking(&self, device_id: &str) -> bool {
        self.sessions.contains_key(device_id)
    }

    pub fn session_is_alive(&self, device_id: &str) -> bool {
        self.sessions
            .get(device_id)
            .map(|s| s.is_alive())
            .unwrap_or(false)
    }

    /// One enumerate-and-reconcile pass.
    ///
    /// Public so tests can drive the loop deterministically; [`run`](Self::run)
    /// calls this on the configured interval.
    pub async fn tick(&mut self) -> Result<()> {
        let devices = self.scanner.scan().await?;
        self.reconcile(devices).await;
        Ok(())
    }

    async fn reconcile(&mut self, devices: Vec<Device>) {
        for device in devices {
            if let Some(session) = self.sessions.get(&device.id) {
                if session.is_alive() {
                    tracing::debug!("session for {} is alive, leaving it", device.id);
                    continue;
                }
                tracing::debug!("session for {} died, replacing it", device.id);
                self.sessions.remove(&device.id);
            }

            match self.factory.create(&device, &self.settings).await {
                Ok(handle) => {
                    tracing::info!(
                        "starting session for {} ({})",
                        device.id,
                        device.transport.label()
                    );
                    self.sessions
                        .entry(device.id.clone())
                        .or_insert(handle)
                        .start();
                }
                Err(e) => {
                    // Retried automatically next tick while the device
                    // is still listed.
                    tracing::error!("failed to start session for {}: {}", device.id, e);
                }
            }
        }
    }

    /// Poll until the stop token fires, then shut down.
    ///
    /// A scan failure is fatal and propagates as-is; already-running
    /// sessions are not cancelled on that path.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(
            "watch loop {} started, polling every {}ms",
            self.id,
            self.interval.as_millis()
        );
        while !self.stop.is_cancelled() {
            self.tick().await?;
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.stop.cancelled() => {}
            }
        }
        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&mut self) {
        tracing::info!(
            "watch loop {} shutting down, cancelling {} session(s)",
            self.id,
            self.sessions.len()
        );
        for session in self.sessions.values() {
            tracing::debug!("cancelling session for {}", session.device().id);
            session.cancel();
        }
        self.sessions.clear();
        self.registry.unregister(&self.id).await;
    }

    /// Run the loop on its own task and hand back a stop/wait handle.
    pub fn spawn(self) -> WatchHandle {
        let stop = self.stop.clone();
        let task = tokio::spawn(self.run());
        WatchHandle { stop, task }
    }
}

/// Remote control for a spawned [`WatchLoop`].
pub struct WatchHandle {
    stop: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl WatchHandle {
    /// Ask the loop to stop; returns immediately.
    pub fn cancel(&self) {
        self.stop.cancel();
    }

    /// Wait for the loop task to finish and surface its result.
    pub async fn wait(self) -> Result<()> {
        self.task.await.context("watch loop task panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{AdbCli, DeviceEnumerator, DeviceKind, RawDevice};
    use crate::session::SessionError;
    use async_trait::async_trait;

    struct StaticListing(Vec<RawDevice>);

    #[async_trait]
    impl DeviceEnumerator for StaticListing {
        async fn list(&self) -> Result<Vec<RawDevice>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenListing;

    #[async_trait]
    impl DeviceEnumerator for BrokenListing {
        async fn list(&self) -> Result<Vec<RawDevice>> {
            anyhow::bail!("enumeration backend unavailable")
        }
    }

    struct NoopFactory;

    #[async_trait]
    impl SessionFactory for NoopFactory {
        async fn create(
            &self,
            device: &Device,
            _settings: &SessionSettings,
        ) -> Result<SessionHandle, SessionError> {
            Ok(SessionHandle::new(device.clone(), std::future::pending()))
        }
    }

    fn scanner(enumerator: impl DeviceEnumerator + 'static) -> DeviceScanner {
        DeviceScanner::new(Arc::new(enumerator), AdbCli::new("/nonexistent/adb"))
    }

    async fn make_loop(enumerator: impl DeviceEnumerator + 'static) -> (WatchLoop, LoopRegistry) {
        let registry = LoopRegistry::new();
        let watch = WatchLoop::new(
            scanner(enumerator),
            Arc::new(NoopFactory),
            SessionSettings::default(),
            Duration::from_millis(10),
            registry.clone(),
        )
        .await;
        (watch, registry)
    }

    #[tokio::test]
    async fn tick_starts_sessions_for_listed_devices() {
        let listing = StaticListing(vec![
            RawDevice::new("emulator-5554", DeviceKind::Usb),
            RawDevice::new("local", DeviceKind::Local),
        ]);
        let (mut watch, _registry) = make_loop(listing).await;

        watch.tick().await.unwrap();

        assert_eq!(watch.session_count(), 1);
        assert!(watch.is_tracking("emulator-5554"));
        assert!(watch.session_is_alive("emulator-5554"));
        assert!(!watch.is_tracking("local"));
    }

    #[tokio::test]
    async fn cancelled_loop_unregisters_without_polling() {
        let (watch, registry) = make_loop(BrokenListing).await;
        assert_eq!(registry.active().await, vec![watch.id()]);

        watch.stop_token().cancel();
        // BrokenListing would make any tick fail, so Ok proves no scan ran.
        watch.run().await.unwrap();

        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn fatal_scan_error_propagates_and_skips_shutdown() {
        let (watch, registry) = make_loop(BrokenListing).await;
        let id = watch.id();

        let result = watch.spawn().wait().await;

        assert!(result.is_err());
        assert_eq!(registry.active().await, vec![id]);
    }
}
