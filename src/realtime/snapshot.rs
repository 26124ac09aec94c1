//! Denormalized bed snapshot: every bed joined with its department, room and
//! current occupant.
//!
//! Join failures never fail the snapshot. A bed whose related records cannot
//! be read is reported with its own fields only and `degraded = true`.

use std::collections::{BTreeMap, HashMap};

use crate::db::DatabaseError;
use crate::models::{Bed, BedView, Department, DepartmentOccupancy, Occupant, Room};
use crate::store::EntityStore;

/// Departments and rooms keyed by id, loaded once per snapshot.
struct WardIndex {
    departments: HashMap<String, Department>,
    rooms: HashMap<String, Room>,
}

impl WardIndex {
    fn load(store: &dyn EntityStore) -> Result<Self, DatabaseError> {
        let departments = store
            .list_departments()?
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        let rooms = store
            .list_rooms()?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        Ok(Self { departments, rooms })
    }
}

/// Full snapshot of every bed, in bed-number order.
///
/// Empty when the bed list itself cannot be read.
pub fn build_snapshot(store: &dyn EntityStore) -> Vec<BedView> {
    let beds = match store.list_beds() {
        Ok(beds) => beds,
        Err(e) => {
            tracing::warn!(error = %e, "Could not list beds for snapshot");
            return Vec::new();
        }
    };

    let index = match WardIndex::load(store) {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!(error = %e, beds = beds.len(), "Ward index unavailable, degrading snapshot");
            return beds.iter().map(BedView::degraded).collect();
        }
    };

    beds.iter()
        .map(|bed| match join_bed(store, &index, bed) {
            Ok(view) => view,
            Err(reason) => {
                tracing::warn!(bed_id = %bed.id, %reason, "Degraded bed record");
                BedView::degraded(bed)
            }
        })
        .collect()
}

fn join_bed(store: &dyn EntityStore, index: &WardIndex, bed: &Bed) -> Result<BedView, String> {
    let department = match &bed.department_id {
        Some(id) => Some(
            index
                .departments
                .get(id)
                .ok_or_else(|| format!("department {id} missing"))?,
        ),
        None => None,
    };
    let room = index
        .rooms
        .get(&bed.room_id)
        .ok_or_else(|| format!("room {} missing", bed.room_id))?;

    let occupant = match store
        .open_assignment_for_bed(&bed.id)
        .map_err(|e| e.to_string())?
    {
        Some(assignment) => {
            let patient = store
                .get_patient(&assignment.patient_id)
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("patient {} missing", assignment.patient_id))?;
            Some(Occupant {
                patient_id: patient.id,
                patient_name: patient.name,
                assignment_id: assignment.id,
                assigned_at: assignment.assigned_at,
            })
        }
        None => None,
    };

    Ok(BedView {
        bed_id: bed.id.clone(),
        bed_number: bed.bed_number.clone(),
        is_occupied: bed.is_occupied,
        department_id: bed.department_id.clone(),
        department_name: department.map(|d| d.name.clone()),
        room_id: bed.room_id.clone(),
        room_floor: Some(room.floor),
        occupant,
        degraded: false,
    })
}

/// Per-department totals, ordered by department id; beds without a department come last.
pub fn occupancy_summary(snapshot: &[BedView]) -> Vec<DepartmentOccupancy> {
    let mut groups: BTreeMap<(bool, Option<&str>), DepartmentOccupancy> = BTreeMap::new();

    for view in snapshot {
        let key = (view.department_id.is_none(), view.department_id.as_deref());
        let entry = groups.entry(key).or_insert_with(|| DepartmentOccupancy {
            department_id: view.department_id.clone(),
            department_name: None,
            total: 0,
            occupied: 0,
            available: 0,
        });
        if entry.department_name.is_none() {
            entry.department_name = view.department_name.clone();
        }
        entry.total += 1;
        if view.is_occupied {
            entry.occupied += 1;
        } else {
            entry.available += 1;
        }
    }

    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{ward_store, Faults, FaultyStore};
    use crate::store::BedWrite;
    use crate::models::BedAssignment;
    use chrono::Utc;

    fn assign(store: &dyn EntityStore, id: &str, bed_id: &str, patient_id: &str) {
        store
            .commit(&BedWrite::Assign(BedAssignment {
                id: id.into(),
                bed_id: bed_id.into(),
                patient_id: patient_id.into(),
                assigned_by: "nurse-1".into(),
                assigned_at: Utc::now(),
                discharged_at: None,
                notes: None,
            }))
            .unwrap();
    }

    #[test]
    fn snapshot_joins_department_room_and_occupant() {
        let store = ward_store();
        assign(store.as_ref(), "A1", "B1", "P1");

        let snapshot = build_snapshot(store.as_ref());
        let ids: Vec<_> = snapshot.iter().map(|v| v.bed_id.as_str()).collect();
        assert_eq!(ids, vec!["B2", "B1", "B3"]);

        let b1 = snapshot.iter().find(|v| v.bed_id == "B1").unwrap();
        assert!(b1.is_occupied);
        assert!(!b1.degraded);
        assert_eq!(b1.department_name.as_deref(), Some("Intensive Care"));
        assert_eq!(b1.room_floor, Some(3));
        let occupant = b1.occupant.as_ref().unwrap();
        assert_eq!(occupant.patient_name, "Ada Park");
        assert_eq!(occupant.assignment_id, "A1");

        let b2 = snapshot.iter().find(|v| v.bed_id == "B2").unwrap();
        assert!(b2.occupant.is_none());
        assert_eq!(b2.room_floor, Some(1));
    }

    #[test]
    fn unreadable_patient_degrades_only_that_bed() {
        let store = ward_store();
        store
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO patients (id, name, department_id, status)
                     VALUES ('P4', 'Dana Cole', 'ICU', 'transferred')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        assign(store.as_ref(), "A1", "B3", "P4");
        assign(store.as_ref(), "A2", "B1", "P1");

        let snapshot = build_snapshot(store.as_ref());
        let b3 = snapshot.iter().find(|v| v.bed_id == "B3").unwrap();
        assert!(b3.degraded);
        assert!(b3.is_occupied);
        assert_eq!(b3.bed_number, "ICU-02");
        assert_eq!(b3.room_id, "R-ICU-1");
        assert!(b3.occupant.is_none());
        assert!(b3.department_name.is_none());
        assert!(b3.room_floor.is_none());

        let b1 = snapshot.iter().find(|v| v.bed_id == "B1").unwrap();
        assert!(!b1.degraded);
        assert!(b1.occupant.is_some());
    }

    #[test]
    fn index_failure_degrades_every_bed() {
        let store = FaultyStore::new(ward_store(), Faults { index: true, ..Faults::default() });
        let snapshot = build_snapshot(&store);
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.iter().all(|v| v.degraded));
    }

    #[test]
    fn bed_list_failure_yields_empty_snapshot() {
        let store = FaultyStore::new(ward_store(), Faults { list_beds: true, ..Faults::default() });
        assert!(build_snapshot(&store).is_empty());
    }

    #[test]
    fn summary_counts_per_department() {
        let store = ward_store();
        assign(store.as_ref(), "A1", "B1", "P1");
        store
            .upsert_bed(&Bed {
                id: "B4".into(),
                bed_number: "FLEX-01".into(),
                department_id: None,
                room_id: "R-ER-1".into(),
                is_occupied: false,
            })
            .unwrap();

        let summary = occupancy_summary(&build_snapshot(store.as_ref()));
        assert_eq!(summary.len(), 3);

        assert_eq!(summary[0].department_id.as_deref(), Some("ER"));
        assert_eq!(summary[0].department_name.as_deref(), Some("Emergency"));
        assert_eq!((summary[0].total, summary[0].occupied, summary[0].available), (1, 0, 1));

        assert_eq!(summary[1].department_id.as_deref(), Some("ICU"));
        assert_eq!((summary[1].total, summary[1].occupied, summary[1].available), (2, 1, 1));

        assert_eq!(summary[2].department_id, None);
        assert_eq!(summary[2].total, 1);
    }

    #[test]
    fn summary_of_empty_snapshot_is_empty() {
        assert!(occupancy_summary(&[]).is_empty());
    }
}
