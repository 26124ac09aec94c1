//! Entity store adapter: the read, commit and change-feed primitives the
//! assignment core needs over beds, patients, departments, rooms and
//! bed assignments.
//!
//! Writes go through a single `commit(BedWrite)` call that the store executes
//! all-or-nothing, re-checking its preconditions at write time. Committed
//! writes are announced on a bed change feed.

pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::db::DatabaseError;
use crate::models::{Bed, BedAssignment, Department, Patient, Room};

pub use sqlite::SqliteStore;

/// The paired writes of one assign or discharge, applied as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BedWrite {
    /// Insert the open assignment and mark its bed occupied.
    Assign(BedAssignment),
    /// Seal the open assignment and mark its bed vacant.
    Discharge {
        assignment_id: String,
        bed_id: String,
        discharged_at: DateTime<Utc>,
    },
}

impl BedWrite {
    pub fn bed_id(&self) -> &str {
        match self {
            BedWrite::Assign(assignment) => &assignment.bed_id,
            BedWrite::Discharge { bed_id, .. } => bed_id,
        }
    }
}

/// Why a bed changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BedChangeKind {
    Assigned,
    Discharged,
    /// Bed record created or edited outside the assignment flow.
    Upserted,
    /// Occupancy flag re-derived by the consistency repair.
    Repaired,
}

/// Notification published on the bed change feed after a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BedChange {
    pub bed_id: String,
    pub kind: BedChangeKind,
}

/// A write the store refused. Nothing was written.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Bed {0} not found")]
    BedNotFound(String),

    #[error("Bed {0} is already occupied")]
    BedOccupied(String),

    #[error("Patient {0} already holds an open bed assignment")]
    PatientAssigned(String),

    #[error("Bed {0} is not occupied")]
    BedVacant(String),

    #[error("Bed assignment {0} is not open")]
    AssignmentClosed(String),
}

impl From<rusqlite::Error> for CommitError {
    fn from(err: rusqlite::Error) -> Self {
        CommitError::Database(DatabaseError::Sqlite(err))
    }
}

/// Document-store primitives used by the assignment core.
///
/// Reads return owned snapshots; `commit` is the only mutation and is atomic.
pub trait EntityStore: Send + Sync {
    fn get_bed(&self, bed_id: &str) -> Result<Option<Bed>, DatabaseError>;

    fn list_beds(&self) -> Result<Vec<Bed>, DatabaseError>;

    fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, DatabaseError>;

    fn list_departments(&self) -> Result<Vec<Department>, DatabaseError>;

    fn list_rooms(&self) -> Result<Vec<Room>, DatabaseError>;

    fn open_assignment_for_bed(&self, bed_id: &str) -> Result<Option<BedAssignment>, DatabaseError>;

    fn open_assignment_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Option<BedAssignment>, DatabaseError>;

    /// Every assignment of the bed, most recent first.
    fn assignments_for_bed(&self, bed_id: &str) -> Result<Vec<BedAssignment>, DatabaseError>;

    /// Every assignment of the patient, most recent first.
    fn assignments_for_patient(&self, patient_id: &str) -> Result<Vec<BedAssignment>, DatabaseError>;

    /// Apply both halves of `write` or neither.
    fn commit(&self, write: &BedWrite) -> Result<(), CommitError>;

    /// Live feed of bed changes committed after this call.
    fn watch_beds(&self) -> Result<broadcast::Receiver<BedChange>, DatabaseError>;
}
