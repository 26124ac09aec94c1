//! Assignment transaction: assign and discharge as single atomic commits.
//!
//! The guard runs first against current snapshots; the store then re-checks
//! the same preconditions inside its write transaction. Whichever check fails
//! first, the caller gets the same `AssignmentError` shape.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use super::error::AssignmentError;
use super::guard::{require_id, validate_assignment, validate_discharge};
use crate::config::{DepartmentPolicy, DEFAULT_ASSIGNED_BY};
use crate::models::{AssignRequest, BedAssignment, DischargeRecord};
use crate::store::{BedWrite, EntityStore};

pub struct AssignmentService {
    store: Arc<dyn EntityStore>,
    policy: DepartmentPolicy,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn EntityStore>, policy: DepartmentPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> DepartmentPolicy {
        self.policy
    }

    /// Place a patient in a bed. Returns the new open assignment.
    pub fn assign(&self, request: &AssignRequest) -> Result<BedAssignment, AssignmentError> {
        let validated = validate_assignment(
            self.store.as_ref(),
            self.policy,
            &request.bed_id,
            &request.patient_id,
        )?;

        let assignment = BedAssignment {
            id: Uuid::new_v4().to_string(),
            bed_id: validated.bed.id,
            patient_id: validated.patient.id,
            assigned_by: non_blank(request.assigned_by.as_deref())
                .unwrap_or(DEFAULT_ASSIGNED_BY)
                .to_string(),
            assigned_at: now(),
            discharged_at: None,
            notes: non_blank(request.notes.as_deref()).map(String::from),
        };

        if let Err(err) = self.store.commit(&BedWrite::Assign(assignment.clone())) {
            let err = AssignmentError::from(err);
            tracing::warn!(
                bed_id = %assignment.bed_id,
                patient_id = %assignment.patient_id,
                error = %err,
                "Bed assignment rejected at commit"
            );
            return Err(err);
        }

        tracing::info!(
            assignment_id = %assignment.id,
            bed_id = %assignment.bed_id,
            patient_id = %assignment.patient_id,
            assigned_by = %assignment.assigned_by,
            "Patient assigned to bed"
        );
        Ok(assignment)
    }

    /// Release the bed's current occupant and seal the open assignment.
    pub fn discharge(&self, bed_id: &str) -> Result<DischargeRecord, AssignmentError> {
        let validated = validate_discharge(self.store.as_ref(), bed_id)?;

        let record = DischargeRecord {
            bed_id: validated.bed.id,
            assignment_id: validated.assignment.id,
            patient_id: validated.assignment.patient_id,
            discharged_at: now(),
        };

        let write = BedWrite::Discharge {
            assignment_id: record.assignment_id.clone(),
            bed_id: record.bed_id.clone(),
            discharged_at: record.discharged_at,
        };
        if let Err(err) = self.store.commit(&write) {
            let err = AssignmentError::from(err);
            tracing::warn!(bed_id = %record.bed_id, error = %err, "Discharge rejected at commit");
            return Err(err);
        }

        tracing::info!(
            assignment_id = %record.assignment_id,
            bed_id = %record.bed_id,
            patient_id = %record.patient_id,
            "Patient discharged from bed"
        );
        Ok(record)
    }

    /// Every assignment of the bed, most recent first.
    pub fn history_by_bed(&self, bed_id: &str) -> Result<Vec<BedAssignment>, AssignmentError> {
        let bed_id = require_id("bed_id", bed_id)?;
        Ok(self.store.assignments_for_bed(bed_id)?)
    }

    /// Every assignment of the patient, most recent first.
    pub fn history_by_patient(&self, patient_id: &str) -> Result<Vec<BedAssignment>, AssignmentError> {
        let patient_id = require_id("patient_id", patient_id)?;
        Ok(self.store.assignments_for_patient(patient_id)?)
    }
}

/// Current time at the precision the store keeps.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
