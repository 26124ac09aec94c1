//! Optimistic bed cache for dashboard clients.
//!
//! A mutation is applied to the local cache before the backend answers, rolled
//! back if the backend rejects it, and reconciled with an authoritative read
//! once it settles. There is no retry: a rejected mutation is surfaced as is.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::assignment::{AssignmentError, AssignmentService};
use crate::models::{AssignRequest, BedAssignment, BedView, DischargeRecord};
use crate::realtime::BedSynchronizer;

// ═══════════════════════════════════════════
// Types
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOp {
    Assign(AssignRequest),
    Discharge(String),
}

impl MutationOp {
    pub fn bed_id(&self) -> &str {
        match self {
            MutationOp::Assign(request) => &request.bed_id,
            MutationOp::Discharge(bed_id) => bed_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Assigned(BedAssignment),
    Discharged(DischargeRecord),
}

/// Lifecycle of the most recent mutation on one bed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    /// Speculative change applied. `before` is the bed's cached record
    /// beforehand and `applied` the record the speculation wrote.
    Pending {
        before: Option<BedView>,
        applied: Option<BedView>,
    },
    Committed(MutationOutcome),
    RolledBack(String),
    /// Cache refreshed from the backend after the mutation settled.
    Reconciled,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Rejected(#[from] AssignmentError),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Authoritative side of the cache.
pub trait BedBackend: Send + Sync {
    fn assign(
        &self,
        request: AssignRequest,
    ) -> impl Future<Output = Result<BedAssignment, BackendError>> + Send;

    fn discharge(
        &self,
        bed_id: String,
    ) -> impl Future<Output = Result<DischargeRecord, BackendError>> + Send;

    fn fetch_beds(&self) -> impl Future<Output = Result<Vec<BedView>, BackendError>> + Send;
}

// ═══════════════════════════════════════════
// Cache
// ═══════════════════════════════════════════

/// Bed records in board order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BedCache {
    beds: Vec<BedView>,
}

impl BedCache {
    pub fn beds(&self) -> &[BedView] {
        &self.beds
    }

    pub fn get(&self, bed_id: &str) -> Option<&BedView> {
        self.beds.iter().find(|b| b.bed_id == bed_id)
    }

    pub fn replace_all(&mut self, beds: Vec<BedView>) {
        self.beds = beds;
    }

    /// Apply the expected effect of `op`. Returns the bed's record before and after.
    fn apply_speculative(&mut self, op: &MutationOp) -> Option<(BedView, BedView)> {
        let bed = self.beds.iter_mut().find(|b| b.bed_id == op.bed_id())?;
        let before = bed.clone();
        match op {
            MutationOp::Assign(_) => bed.is_occupied = true,
            MutationOp::Discharge(_) => {
                bed.is_occupied = false;
                bed.occupant = None;
            }
        }
        Some((before, bed.clone()))
    }

    /// Put `before` back, unless a snapshot replaced the speculative record meanwhile.
    /// Returns whether the record was restored.
    fn restore(&mut self, before: BedView, applied: &BedView) -> bool {
        match self.beds.iter_mut().find(|b| b.bed_id == before.bed_id) {
            Some(bed) if bed == applied => {
                *bed = before;
                true
            }
            _ => false,
        }
    }
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ═══════════════════════════════════════════
// Reconciler
// ═══════════════════════════════════════════

pub struct Reconciler<B> {
    backend: B,
    cache: Mutex<BedCache>,
    states: Mutex<HashMap<String, MutationState>>,
}

impl<B: BedBackend> Reconciler<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: Mutex::new(BedCache::default()),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn beds(&self) -> Vec<BedView> {
        relock(&self.cache).beds().to_vec()
    }

    pub fn bed(&self, bed_id: &str) -> Option<BedView> {
        relock(&self.cache).get(bed_id).cloned()
    }

    /// State of the latest mutation on `bed_id`; `Idle` if it was never mutated.
    pub fn state(&self, bed_id: &str) -> MutationState {
        relock(&self.states).get(bed_id).cloned().unwrap_or_default()
    }

    /// Replace the cache with a pushed snapshot.
    pub fn apply_snapshot(&self, beds: Vec<BedView>) {
        relock(&self.cache).replace_all(beds);
    }

    /// Load the cache from the backend.
    pub async fn refresh(&self) -> Result<(), BackendError> {
        let beds = self.backend.fetch_beds().await?;
        self.apply_snapshot(beds);
        Ok(())
    }

    fn transition(&self, bed_id: &str, next: MutationState) {
        relock(&self.states).insert(bed_id.to_string(), next);
    }

    pub async fn mutate(&self, op: MutationOp) -> Result<MutationOutcome, BackendError> {
        let bed_id = op.bed_id().to_string();
        let speculated = relock(&self.cache).apply_speculative(&op);
        let (before, applied) = match &speculated {
            Some((before, applied)) => (Some(before.clone()), Some(applied.clone())),
            None => (None, None),
        };
        self.transition(&bed_id, MutationState::Pending { before, applied });

        let result = match &op {
            MutationOp::Assign(request) => self
                .backend
                .assign(request.clone())
                .await
                .map(MutationOutcome::Assigned),
            MutationOp::Discharge(bed_id) => self
                .backend
                .discharge(bed_id.clone())
                .await
                .map(MutationOutcome::Discharged),
        };

        match &result {
            Ok(outcome) => self.transition(&bed_id, MutationState::Committed(outcome.clone())),
            Err(e) => {
                if let Some((before, applied)) = speculated {
                    if !relock(&self.cache).restore(before, &applied) {
                        tracing::debug!(%bed_id, "Snapshot superseded speculative record, not restoring");
                    }
                }
                tracing::warn!(%bed_id, error = %e, "Optimistic bed mutation rolled back");
                self.transition(&bed_id, MutationState::RolledBack(e.to_string()));
            }
        }

        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Bed cache refresh failed, keeping local state");
        }
        self.transition(&bed_id, MutationState::Reconciled);

        result
    }
}

// ═══════════════════════════════════════════
// In-process backend
// ═══════════════════════════════════════════

/// Backend calling the assignment service in this process.
#[derive(Clone)]
pub struct LocalBackend {
    service: Arc<AssignmentService>,
    synchronizer: BedSynchronizer,
}

impl LocalBackend {
    pub fn new(service: Arc<AssignmentService>, synchronizer: BedSynchronizer) -> Self {
        Self {
            service,
            synchronizer,
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T, BackendError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AssignmentError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BackendError::Unavailable(e.to_string()))?
        .map_err(BackendError::from)
}

impl BedBackend for LocalBackend {
    fn assign(
        &self,
        request: AssignRequest,
    ) -> impl Future<Output = Result<BedAssignment, BackendError>> + Send {
        let service = self.service.clone();
        blocking(move || service.assign(&request))
    }

    fn discharge(
        &self,
        bed_id: String,
    ) -> impl Future<Output = Result<DischargeRecord, BackendError>> + Send {
        let service = self.service.clone();
        blocking(move || service.discharge(&bed_id))
    }

    fn fetch_beds(&self) -> impl Future<Output = Result<Vec<BedView>, BackendError>> + Send {
        let synchronizer = self.synchronizer.clone();
        blocking(move || Ok(synchronizer.snapshot()))
    }
}
