//! Shared types for the API layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core_state::CoreState;
use crate::db::ConsistencyReport;
use crate::models::{BedAssignment, BedView, DepartmentOccupancy};

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Body of `POST /api/beds/:bed_id/assign`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignBody {
    pub patient_id: String,
    #[serde(default)]
    pub assigned_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BedsResponse {
    pub beds: Vec<BedView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OccupancyResponse {
    pub departments: Vec<DepartmentOccupancy>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub assignments: Vec<BedAssignment>,
}

#[derive(Debug, Serialize)]
pub struct RepairResponse {
    pub repaired: Vec<String>,
    pub report: ConsistencyReport,
}
