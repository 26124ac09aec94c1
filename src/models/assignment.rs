use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stay of a patient in a bed. Never deleted: the table is the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedAssignment {
    pub id: String,
    pub bed_id: String,
    pub patient_id: String,
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
    /// `None` while the patient still occupies the bed.
    pub discharged_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl BedAssignment {
    pub fn is_open(&self) -> bool {
        self.discharged_at.is_none()
    }
}

/// Request to place a patient in a bed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignRequest {
    pub bed_id: String,
    pub patient_id: String,
    #[serde(default)]
    pub assigned_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of a successful discharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DischargeRecord {
    pub bed_id: String,
    pub assignment_id: String,
    pub patient_id: String,
    pub discharged_at: DateTime<Utc>,
}
