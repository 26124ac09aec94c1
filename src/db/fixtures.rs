//! Shared test ward: two departments, one room each, three beds, three patients.
//!
//! | bed | number | department | room    |
//! |-----|--------|------------|---------|
//! | B1  | ICU-01 | ICU        | R-ICU-1 |
//! | B2  | ER-01  | ER         | R-ER-1  |
//! | B3  | ICU-02 | ICU        | R-ICU-1 |
//!
//! Patients: P1 (ICU), P2 (ICU), P3 (no department). All beds start vacant.

use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::broadcast;

use super::repository::{insert_bed, insert_department, insert_patient, insert_room};
use super::DatabaseError;
use crate::models::{Bed, BedAssignment, Department, Patient, PatientStatus, Room};
use crate::store::{BedChange, BedWrite, CommitError, EntityStore, SqliteStore};

pub(crate) fn seed_ward(conn: &Connection) {
    for (id, name) in [("ICU", "Intensive Care"), ("ER", "Emergency")] {
        insert_department(conn, &Department { id: id.into(), name: name.into() }).unwrap();
    }

    insert_room(conn, &Room {
        id: "R-ICU-1".into(),
        department_id: "ICU".into(),
        floor: 3,
        capacity: 4,
    })
    .unwrap();
    insert_room(conn, &Room {
        id: "R-ER-1".into(),
        department_id: "ER".into(),
        floor: 1,
        capacity: 6,
    })
    .unwrap();

    for (id, number, department, room) in [
        ("B1", "ICU-01", "ICU", "R-ICU-1"),
        ("B2", "ER-01", "ER", "R-ER-1"),
        ("B3", "ICU-02", "ICU", "R-ICU-1"),
    ] {
        insert_bed(conn, &Bed {
            id: id.into(),
            bed_number: number.into(),
            department_id: Some(department.into()),
            room_id: room.into(),
            is_occupied: false,
        })
        .unwrap();
    }

    for (id, name, department) in [
        ("P1", "Ada Park", Some("ICU")),
        ("P2", "Ben Osei", Some("ICU")),
        ("P3", "Cleo Ruiz", None),
    ] {
        insert_patient(conn, &Patient {
            id: id.into(),
            name: name.into(),
            department_id: department.map(String::from),
            status: PatientStatus::Admitted,
        })
        .unwrap();
    }
}

/// In-memory store seeded with the shared ward.
pub(crate) fn ward_store() -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .with_connection(|conn| {
            seed_ward(conn);
            Ok(())
        })
        .unwrap();
    Arc::new(store)
}

/// Store wrapper that fails selected primitives, for exercising degraded paths.
#[derive(Default)]
pub(crate) struct Faults {
    pub list_beds: bool,
    pub index: bool,
    pub watch: bool,
    /// Hand out a feed whose sender is already gone.
    pub closed_feed: bool,
}

pub(crate) struct FaultyStore {
    pub inner: Arc<SqliteStore>,
    pub faults: Faults,
}

impl FaultyStore {
    pub fn new(inner: Arc<SqliteStore>, faults: Faults) -> Self {
        Self { inner, faults }
    }
}

fn injected() -> DatabaseError {
    DatabaseError::ConstraintViolation("injected fault".into())
}

impl EntityStore for FaultyStore {
    fn get_bed(&self, bed_id: &str) -> Result<Option<Bed>, DatabaseError> {
        self.inner.get_bed(bed_id)
    }

    fn list_beds(&self) -> Result<Vec<Bed>, DatabaseError> {
        if self.faults.list_beds {
            return Err(injected());
        }
        self.inner.list_beds()
    }

    fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, DatabaseError> {
        self.inner.get_patient(patient_id)
    }

    fn list_departments(&self) -> Result<Vec<Department>, DatabaseError> {
        if self.faults.index {
            return Err(injected());
        }
        self.inner.list_departments()
    }

    fn list_rooms(&self) -> Result<Vec<Room>, DatabaseError> {
        self.inner.list_rooms()
    }

    fn open_assignment_for_bed(&self, bed_id: &str) -> Result<Option<BedAssignment>, DatabaseError> {
        self.inner.open_assignment_for_bed(bed_id)
    }

    fn open_assignment_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Option<BedAssignment>, DatabaseError> {
        self.inner.open_assignment_for_patient(patient_id)
    }

    fn assignments_for_bed(&self, bed_id: &str) -> Result<Vec<BedAssignment>, DatabaseError> {
        self.inner.assignments_for_bed(bed_id)
    }

    fn assignments_for_patient(&self, patient_id: &str) -> Result<Vec<BedAssignment>, DatabaseError> {
        self.inner.assignments_for_patient(patient_id)
    }

    fn commit(&self, write: &BedWrite) -> Result<(), CommitError> {
        self.inner.commit(write)
    }

    fn watch_beds(&self) -> Result<broadcast::Receiver<BedChange>, DatabaseError> {
        if self.faults.watch {
            return Err(injected());
        }
        if self.faults.closed_feed {
            let (_tx, rx) = broadcast::channel(1);
            return Ok(rx);
        }
        self.inner.watch_beds()
    }
}
