//! Real-time bed synchronizer.
//!
//! Each subscription owns a task that listens on the store's bed change feed
//! and pushes a full re-derived snapshot to its callback after every change.
//! Queued notifications are coalesced, so a burst of commits costs one snapshot.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::snapshot::build_snapshot;
use super::subscription::{ListenerSlot, SubscriptionHandle};
use crate::models::BedView;
use crate::store::{BedChange, EntityStore};

#[derive(Clone)]
pub struct BedSynchronizer {
    store: Arc<dyn EntityStore>,
}

impl BedSynchronizer {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Current snapshot, computed on the calling thread.
    pub fn snapshot(&self) -> Vec<BedView> {
        build_snapshot(self.store.as_ref())
    }

    /// Register `on_snapshot` for the initial snapshot and one per change.
    ///
    /// Must be called from within a tokio runtime. If the change feed cannot be
    /// opened, or closes, the callback receives an empty list and the
    /// subscription ends.
    pub fn subscribe<F>(&self, on_snapshot: F) -> SubscriptionHandle
    where
        F: FnMut(Vec<BedView>) + Send + 'static,
    {
        let slot = Arc::new(ListenerSlot::new(Box::new(on_snapshot)));
        let store = self.store.clone();
        let task = tokio::spawn(run_subscription(store, slot.clone()));
        SubscriptionHandle::new(slot, task.abort_handle())
    }
}

async fn run_subscription(store: Arc<dyn EntityStore>, slot: Arc<ListenerSlot>) {
    // Open the feed before the first snapshot so no commit falls in between.
    let mut feed = match store.watch_beds() {
        Ok(feed) => feed,
        Err(e) => {
            tracing::warn!(error = %e, "Could not open bed change feed");
            slot.deliver(Vec::new());
            return;
        }
    };

    if !slot.deliver(derive(&store).await) {
        return;
    }

    loop {
        match feed.recv().await {
            Ok(change) => {
                let coalesced = drain(&mut feed);
                tracing::debug!(
                    bed_id = %change.bed_id,
                    kind = ?change.kind,
                    coalesced,
                    "Bed change received"
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Bed change feed lagged, resyncing");
                drain(&mut feed);
            }
            Err(RecvError::Closed) => {
                tracing::info!("Bed change feed closed");
                slot.deliver(Vec::new());
                return;
            }
        }

        if !slot.is_active() || !slot.deliver(derive(&store).await) {
            return;
        }
    }
}

/// Discard notifications already queued; the next snapshot covers them.
fn drain(feed: &mut broadcast::Receiver<BedChange>) -> usize {
    let mut drained = 0;
    loop {
        match feed.try_recv() {
            Ok(_) => drained += 1,
            Err(TryRecvError::Lagged(skipped)) => drained += skipped as usize,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return drained,
        }
    }
}

async fn derive(store: &Arc<dyn EntityStore>) -> Vec<BedView> {
    let store = store.clone();
    match tokio::task::spawn_blocking(move || build_snapshot(store.as_ref())).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!(error = %e, "Snapshot task failed");
            Vec::new()
        }
    }
}
