//! Registry of running watch loops
//!
//! Every watch loop parks its stop token here while it runs, keyed by
//! the loop's id. Whoever holds the registry can stop all polling with
//! one call without owning any loop directly; the ctrl-c handler in
//! `main` does exactly that.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct LoopRegistry {
    inner: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
}

impl LoopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, id: Uuid, stop: CancellationToken) {
        let mut guard = self.inner.lock().await;
        guard.insert(id, stop);
        tracing::debug!("registered watch loop {}", id);
    }

    /// Remove a loop's entry. Returns whether it was present.
    pub async fn unregister(&self, id: &Uuid) -> bool {
        let mut guard = self.inner.lock().await;
        let removed = guard.remove(id).is_some();
        if removed {
            tracing::debug!("unregistered watch loop {}", id);
        }
        removed
    }

    /// Fire the stop token of every registered loop.
    ///
    /// Entries are not removed here; each loop unregisters itself once
    /// its own shutdown has finished.
    pub async fn cancel_all(&self) {
        let guard = self.inner.lock().await;
        for (id, stop) in guard.iter() {
            tracing::debug!("stopping watch loop {}", id);
            stop.cancel();
        }
    }

    pub async fn active(&self) -> Vec<Uuid> {
        let guard = self.inner.lock().await;
        guard.keys().copied().collect()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
