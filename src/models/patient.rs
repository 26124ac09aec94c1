use serde::{Deserialize, Serialize};

use super::enums::PatientStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub department_id: Option<String>,
    pub status: PatientStatus,
}
