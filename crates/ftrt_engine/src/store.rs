use std::sync::Arc;

use ftrt_core::{DashboardModel, ErrorInfo};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// No cycle has completed yet.
    Loading,
    /// The model came from a live upstream response.
    Ready,
    /// The model came from the fallback resolver.
    ReadyDegraded,
}

/// What the rendering layer reads. Writes are whole-snapshot replacements;
/// no field is ever mutated in place, so a reader can never observe a model
/// assembled from two different cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub model: Option<Arc<DashboardModel>>,
    pub status: StoreStatus,
    pub last_error: Option<ErrorInfo>,
}

impl StoreSnapshot {
    fn initial() -> Self {
        Self {
            model: None,
            status: StoreStatus::Loading,
            last_error: None,
        }
    }
}

/// Writer half, owned by the scheduler task.
#[derive(Debug)]
pub struct ModelStore {
    tx: watch::Sender<StoreSnapshot>,
}

/// Read/subscribe accessor handed to the rendering layer. Clones are cheap
/// and independent.
#[derive(Debug, Clone)]
pub struct ModelWatcher {
    rx: watch::Receiver<StoreSnapshot>,
}

impl ModelStore {
    pub fn new() -> (Self, ModelWatcher) {
        let (tx, rx) = watch::channel(StoreSnapshot::initial());
        (Self { tx }, ModelWatcher { rx })
    }

    /// Additional subscription handle.
    pub fn watcher(&self) -> ModelWatcher {
        ModelWatcher {
            rx: self.tx.subscribe(),
        }
    }

    pub fn publish_fresh(&self, model: DashboardModel) {
        let _ = self.tx.send(StoreSnapshot {
            model: Some(Arc::new(model)),
            status: StoreStatus::Ready,
            last_error: None,
        });
    }

    pub fn publish_degraded(&self, model: DashboardModel, error: Option<ErrorInfo>) {
        let _ = self.tx.send(StoreSnapshot {
            model: Some(Arc::new(model)),
            status: StoreStatus::ReadyDegraded,
            last_error: error,
        });
    }
}

impl ModelWatcher {
    /// Current snapshot, cloned out of the channel.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next published snapshot. Returns `false` once the
    /// scheduler has gone away and no further change can arrive.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
