//! Validation guard: read-only precondition checks for assign and discharge.
//!
//! Checks run in a fixed order and stop at the first failure, so a caller
//! always sees the same error for the same state. Nothing here writes.

use super::error::{AssignmentError, ConflictReason, EntityKind};
use crate::config::DepartmentPolicy;
use crate::models::{Bed, BedAssignment, Patient};
use crate::store::EntityStore;

/// Entities that passed `validate_assignment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAssignment {
    pub bed: Bed,
    pub patient: Patient,
}

/// Bed and open assignment that passed `validate_discharge`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDischarge {
    pub bed: Bed,
    pub assignment: BedAssignment,
}

/// Trimmed id, or a validation error naming the field.
pub(crate) fn require_id<'a>(field: &str, value: &'a str) -> Result<&'a str, AssignmentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AssignmentError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

pub fn validate_assignment(
    store: &dyn EntityStore,
    policy: DepartmentPolicy,
    bed_id: &str,
    patient_id: &str,
) -> Result<ValidatedAssignment, AssignmentError> {
    let bed_id = require_id("bed_id", bed_id)?;
    let patient_id = require_id("patient_id", patient_id)?;

    let bed = store
        .get_bed(bed_id)?
        .ok_or(AssignmentError::NotFound(EntityKind::Bed))?;
    if bed.is_occupied {
        return Err(AssignmentError::Conflict(ConflictReason::BedOccupied));
    }

    let patient = store
        .get_patient(patient_id)?
        .ok_or(AssignmentError::NotFound(EntityKind::Patient))?;
    if store.open_assignment_for_patient(patient_id)?.is_some() {
        return Err(AssignmentError::Conflict(ConflictReason::PatientAssigned));
    }

    check_department(&bed, &patient, policy)?;

    Ok(ValidatedAssignment { bed, patient })
}

fn check_department(
    bed: &Bed,
    patient: &Patient,
    policy: DepartmentPolicy,
) -> Result<(), AssignmentError> {
    match (&bed.department_id, &patient.department_id) {
        (Some(bed_dept), Some(patient_dept)) if bed_dept != patient_dept => {
            Err(AssignmentError::Conflict(ConflictReason::DepartmentMismatch))
        }
        (Some(_), None) if policy == DepartmentPolicy::RequireDepartment => {
            Err(AssignmentError::Conflict(ConflictReason::PatientWithoutDepartment))
        }
        _ => Ok(()),
    }
}

pub fn validate_discharge(
    store: &dyn EntityStore,
    bed_id: &str,
) -> Result<ValidatedDischarge, AssignmentError> {
    let bed_id = require_id("bed_id", bed_id)?;

    let bed = store
        .get_bed(bed_id)?
        .ok_or(AssignmentError::NotFound(EntityKind::Bed))?;
    if !bed.is_occupied {
        return Err(AssignmentError::Conflict(ConflictReason::BedNotOccupied));
    }

    let assignment = store
        .open_assignment_for_bed(bed_id)?
        .ok_or(AssignmentError::NotFound(EntityKind::Assignment))?;

    Ok(ValidatedDischarge { bed, assignment })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::ward_store;
    use crate::db::repository;
    use crate::models::BedAssignment;
    use crate::store::{BedWrite, SqliteStore};
    use chrono::Utc;

    fn occupy(store: &SqliteStore, bed_id: &str, patient_id: &str) {
        store
            .commit(&BedWrite::Assign(BedAssignment {
                id: format!("A-{bed_id}"),
                bed_id: bed_id.into(),
                patient_id: patient_id.into(),
                assigned_by: "nurse-1".into(),
                assigned_at: Utc::now(),
                discharged_at: None,
                notes: None,
            }))
            .unwrap();
    }

    fn conflict(err: AssignmentError) -> ConflictReason {
        match err {
            AssignmentError::Conflict(reason) => reason,
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn same_department_passes() {
        let store = ward_store();
        let ok = validate_assignment(store.as_ref(), DepartmentPolicy::default(), "B1", "P1").unwrap();
        assert_eq!(ok.bed.id, "B1");
        assert_eq!(ok.patient.id, "P1");
    }

    #[test]
    fn ids_are_trimmed() {
        let store = ward_store();
        let ok = validate_assignment(store.as_ref(), DepartmentPolicy::default(), " B1 ", "P1\n").unwrap();
        assert_eq!(ok.bed.id, "B1");
    }

    #[test]
    fn blank_ids_fail_validation_first() {
        let store = ward_store();
        let err = validate_assignment(store.as_ref(), DepartmentPolicy::default(), "  ", "nobody").unwrap_err();
        assert!(matches!(err, AssignmentError::Validation(ref m) if m.contains("bed_id")));
        let err = validate_assignment(store.as_ref(), DepartmentPolicy::default(), "B1", "").unwrap_err();
        assert!(matches!(err, AssignmentError::Validation(ref m) if m.contains("patient_id")));
    }

    #[test]
    fn missing_bed_before_missing_patient() {
        let store = ward_store();
        let err = validate_assignment(store.as_ref(), DepartmentPolicy::default(), "B9", "P9").unwrap_err();
        assert!(matches!(err, AssignmentError::NotFound(EntityKind::Bed)));
        let err = validate_assignment(store.as_ref(), DepartmentPolicy::default(), "B1", "P9").unwrap_err();
        assert!(matches!(err, AssignmentError::NotFound(EntityKind::Patient)));
    }

    #[test]
    fn occupied_bed_checked_before_patient_lookup() {
        let store = ward_store();
        occupy(&store, "B1", "P1");
        let err = validate_assignment(store.as_ref(), DepartmentPolicy::default(), "B1", "P9").unwrap_err();
        assert_eq!(conflict(err), ConflictReason::BedOccupied);
    }

    #[test]
    fn patient_holding_a_bed_is_rejected() {
        let store = ward_store();
        occupy(&store, "B1", "P1");
        let err = validate_assignment(store.as_ref(), DepartmentPolicy::default(), "B3", "P1").unwrap_err();
        assert_eq!(conflict(err), ConflictReason::PatientAssigned);
    }

    #[test]
    fn cross_department_is_rejected() {
        let store = ward_store();
        let err = validate_assignment(store.as_ref(), DepartmentPolicy::default(), "B2", "P1").unwrap_err();
        assert_eq!(conflict(err), ConflictReason::DepartmentMismatch);
    }

    #[test]
    fn patient_without_department_follows_policy() {
        let store = ward_store();
        assert!(validate_assignment(store.as_ref(), DepartmentPolicy::AllowUnassigned, "B1", "P3").is_ok());
        let err = validate_assignment(store.as_ref(), DepartmentPolicy::RequireDepartment, "B1", "P3")
            .unwrap_err();
        assert_eq!(conflict(err), ConflictReason::PatientWithoutDepartment);
    }

    #[test]
    fn bed_without_department_accepts_anyone() {
        let store = ward_store();
        store
            .upsert_bed(&Bed {
                id: "B4".into(),
                bed_number: "FLEX-01".into(),
                department_id: None,
                room_id: "R-ER-1".into(),
                is_occupied: false,
            })
            .unwrap();
        assert!(validate_assignment(store.as_ref(), DepartmentPolicy::RequireDepartment, "B4", "P1").is_ok());
        assert!(validate_assignment(store.as_ref(), DepartmentPolicy::RequireDepartment, "B4", "P3").is_ok());
    }

    #[test]
    fn discharge_of_occupied_bed_returns_open_assignment() {
        let store = ward_store();
        occupy(&store, "B1", "P1");
        let ok = validate_discharge(store.as_ref(), "B1").unwrap();
        assert_eq!(ok.assignment.patient_id, "P1");
        assert!(ok.assignment.is_open());
    }

    #[test]
    fn discharge_failures_in_order() {
        let store = ward_store();
        assert!(matches!(
            validate_discharge(store.as_ref(), "").unwrap_err(),
            AssignmentError::Validation(_)
        ));
        assert!(matches!(
            validate_discharge(store.as_ref(), "B9").unwrap_err(),
            AssignmentError::NotFound(EntityKind::Bed)
        ));
        assert_eq!(
            conflict(validate_discharge(store.as_ref(), "B1").unwrap_err()),
            ConflictReason::BedNotOccupied
        );
    }

    #[test]
    fn flagged_bed_without_open_assignment() {
        let store = ward_store();
        store
            .with_connection(|conn| repository::claim_bed(conn, "B2").map(|_| ()))
            .unwrap();
        let err = validate_discharge(store.as_ref(), "B2").unwrap_err();
        assert!(matches!(err, AssignmentError::NotFound(EntityKind::Assignment)));
    }
}
