use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bed::Bed;

/// Patient currently holding a bed, as shown on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub patient_id: String,
    pub patient_name: String,
    pub assignment_id: String,
    pub assigned_at: DateTime<Utc>,
}

/// Denormalized bed record pushed to dashboards: bed + department + room + occupant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedView {
    pub bed_id: String,
    pub bed_number: String,
    pub is_occupied: bool,
    pub department_id: Option<String>,
    pub department_name: Option<String>,
    pub room_id: String,
    pub room_floor: Option<i32>,
    pub occupant: Option<Occupant>,
    /// Set when the related records could not be joined; only bed fields are trustworthy.
    pub degraded: bool,
}

impl BedView {
    /// Bed fields only, every related field left empty.
    pub fn degraded(bed: &Bed) -> Self {
        Self {
            bed_id: bed.id.clone(),
            bed_number: bed.bed_number.clone(),
            is_occupied: bed.is_occupied,
            department_id: bed.department_id.clone(),
            department_name: None,
            room_id: bed.room_id.clone(),
            room_floor: None,
            occupant: None,
            degraded: true,
        }
    }
}

/// Per-department occupancy counts for dashboard headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentOccupancy {
    pub department_id: Option<String>,
    pub department_name: Option<String>,
    pub total: usize,
    pub occupied: usize,
    pub available: usize,
}
