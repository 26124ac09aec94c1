//! Subscription handles for snapshot listeners.
//!
//! A listener's callback runs under its slot's gate. `cancel` flips the
//! active flag and then takes the gate, so once it returns no callback is
//! running or will run. Cancelling from inside the callback skips the wait
//! and takes effect when the callback returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tokio::task::AbortHandle;

use crate::models::BedView;

pub type SnapshotCallback = Box<dyn FnMut(Vec<BedView>) + Send + 'static>;

pub(crate) struct ListenerSlot {
    active: AtomicBool,
    gate: Mutex<SnapshotCallback>,
    delivering: Mutex<Option<ThreadId>>,
}

/// A panicking callback must not wedge cancellation.
fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ListenerSlot {
    pub(crate) fn new(callback: SnapshotCallback) -> Self {
        Self {
            active: AtomicBool::new(true),
            gate: Mutex::new(callback),
            delivering: Mutex::new(None),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Run the callback unless cancelled. Returns whether the slot is still active.
    pub(crate) fn deliver(&self, snapshot: Vec<BedView>) -> bool {
        let mut callback = relock(&self.gate);
        if !self.is_active() {
            return false;
        }
        *relock(&self.delivering) = Some(thread::current().id());
        callback(snapshot);
        *relock(&self.delivering) = None;
        self.is_active()
    }

    pub(crate) fn cancel(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let from_callback = *relock(&self.delivering) == Some(thread::current().id());
        if !from_callback {
            // Wait out an in-flight delivery on another thread.
            drop(relock(&self.gate));
        }
    }
}

/// Live registration of one snapshot listener.
///
/// Dropping the handle unsubscribes.
pub struct SubscriptionHandle {
    slot: std::sync::Arc<ListenerSlot>,
    task: Option<AbortHandle>,
}

impl SubscriptionHandle {
    pub(crate) fn new(slot: std::sync::Arc<ListenerSlot>, task: AbortHandle) -> Self {
        Self {
            slot,
            task: Some(task),
        }
    }

    /// Stop deliveries. Idempotent; after it returns the callback is not invoked again.
    pub fn unsubscribe(&self) {
        self.slot.cancel();
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_active()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.is_active())
            .finish()
    }
}
