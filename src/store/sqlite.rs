//! SQLite-backed entity store.
//!
//! One connection behind a mutex. Every `commit` runs in an IMMEDIATE
//! transaction that re-checks occupancy and open assignments before writing,
//! so two racing assigns for the same bed cannot both land.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use tokio::sync::broadcast;

use super::{BedChange, BedChangeKind, BedWrite, CommitError, EntityStore};
use crate::db::{self, repository, ConsistencyReport, DatabaseError};
use crate::models::{Bed, BedAssignment, Department, Patient, Room};

/// Buffered notifications per feed before slow subscribers start lagging.
const CHANGE_FEED_CAPACITY: usize = 256;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<BedChange>,
}

impl SqliteStore {
    /// Open (and migrate) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    /// Open a private in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_memory_database()?))
    }

    fn from_connection(conn: Connection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            conn: Mutex::new(conn),
            changes,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Run `f` against the connection. Writes made here are not announced on the feed.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Create or edit a bed and announce it to subscribers.
    pub fn upsert_bed(&self, bed: &Bed) -> Result<(), DatabaseError> {
        self.with_connection(|conn| repository::upsert_bed(conn, bed))?;
        self.publish(&bed.id, BedChangeKind::Upserted);
        Ok(())
    }

    /// Open change feeds, one per live subscription.
    pub fn feed_subscribers(&self) -> usize {
        self.changes.receiver_count()
    }

    pub fn check_consistency(&self) -> Result<ConsistencyReport, DatabaseError> {
        self.with_connection(repository::check_consistency)
    }

    /// Re-derive drifted occupancy flags; each repaired bed is announced.
    pub fn repair_consistency(&self) -> Result<Vec<String>, DatabaseError> {
        let repaired = {
            let mut conn = self.lock()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let repaired = repository::repair_consistency(&tx)?;
            tx.commit()?;
            repaired
        };
        for bed_id in &repaired {
            self.publish(bed_id, BedChangeKind::Repaired);
        }
        Ok(repaired)
    }

    fn publish(&self, bed_id: &str, kind: BedChangeKind) {
        let change = BedChange {
            bed_id: bed_id.to_string(),
            kind,
        };
        // Err only means nobody is listening right now.
        match self.changes.send(change) {
            Ok(receivers) => tracing::debug!(bed_id, ?kind, receivers, "Bed change published"),
            Err(_) => tracing::debug!(bed_id, ?kind, "Bed change published with no subscribers"),
        }
    }
}

fn apply_assign(conn: &Connection, assignment: &BedAssignment) -> Result<(), CommitError> {
    let bed_id = assignment.bed_id.as_str();
    if !repository::bed_exists(conn, bed_id)? {
        return Err(CommitError::BedNotFound(bed_id.into()));
    }
    // An open row with a vacant flag is drift; still treat the bed as taken.
    if repository::get_open_assignment_for_bed(conn, bed_id)?.is_some() {
        return Err(CommitError::BedOccupied(bed_id.into()));
    }
    if !repository::claim_bed(conn, bed_id)? {
        return Err(CommitError::BedOccupied(bed_id.into()));
    }
    if repository::get_open_assignment_for_patient(conn, &assignment.patient_id)?.is_some() {
        return Err(CommitError::PatientAssigned(assignment.patient_id.clone()));
    }
    repository::insert_assignment(conn, assignment)?;
    Ok(())
}

fn apply_discharge(
    conn: &Connection,
    assignment_id: &str,
    bed_id: &str,
    discharged_at: &DateTime<Utc>,
) -> Result<(), CommitError> {
    if !repository::bed_exists(conn, bed_id)? {
        return Err(CommitError::BedNotFound(bed_id.into()));
    }
    if !repository::close_assignment(conn, assignment_id, bed_id, discharged_at)? {
        return Err(CommitError::AssignmentClosed(assignment_id.into()));
    }
    if !repository::release_bed(conn, bed_id)? {
        return Err(CommitError::BedVacant(bed_id.into()));
    }
    Ok(())
}

impl EntityStore for SqliteStore {
    fn get_bed(&self, bed_id: &str) -> Result<Option<Bed>, DatabaseError> {
        self.with_connection(|conn| repository::get_bed(conn, bed_id))
    }

    fn list_beds(&self) -> Result<Vec<Bed>, DatabaseError> {
        self.with_connection(repository::list_beds)
    }

    fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, DatabaseError> {
        self.with_connection(|conn| repository::get_patient(conn, patient_id))
    }

    fn list_departments(&self) -> Result<Vec<Department>, DatabaseError> {
        self.with_connection(repository::list_departments)
    }

    fn list_rooms(&self) -> Result<Vec<Room>, DatabaseError> {
        self.with_connection(repository::list_rooms)
    }

    fn open_assignment_for_bed(&self, bed_id: &str) -> Result<Option<BedAssignment>, DatabaseError> {
        self.with_connection(|conn| repository::get_open_assignment_for_bed(conn, bed_id))
    }

    fn open_assignment_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Option<BedAssignment>, DatabaseError> {
        self.with_connection(|conn| repository::get_open_assignment_for_patient(conn, patient_id))
    }

    fn assignments_for_bed(&self, bed_id: &str) -> Result<Vec<BedAssignment>, DatabaseError> {
        self.with_connection(|conn| repository::list_assignments_for_bed(conn, bed_id))
    }

    fn assignments_for_patient(&self, patient_id: &str) -> Result<Vec<BedAssignment>, DatabaseError> {
        self.with_connection(|conn| repository::list_assignments_for_patient(conn, patient_id))
    }

    fn commit(&self, write: &BedWrite) -> Result<(), CommitError> {
        let kind = {
            let mut conn = self.lock()?;
            // Dropping `tx` without commit rolls back both halves.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let kind = match write {
                BedWrite::Assign(assignment) => {
                    apply_assign(&tx, assignment)?;
                    BedChangeKind::Assigned
                }
                BedWrite::Discharge {
                    assignment_id,
                    bed_id,
                    discharged_at,
                } => {
                    apply_discharge(&tx, assignment_id, bed_id, discharged_at)?;
                    BedChangeKind::Discharged
                }
            };
            tx.commit()?;
            kind
        };

        self.publish(write.bed_id(), kind);
        Ok(())
    }

    fn watch_beds(&self) -> Result<broadcast::Receiver<BedChange>, DatabaseError> {
        Ok(self.changes.subscribe())
    }
}
