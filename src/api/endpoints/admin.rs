//! Occupancy consistency check and repair.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, RepairResponse};
use crate::db::ConsistencyReport;

/// `GET /api/admin/consistency`: report occupancy drift without changing anything.
pub async fn check(
    State(ctx): State<ApiContext>,
) -> Result<Json<ConsistencyReport>, ApiError> {
    Ok(Json(ctx.core.store().check_consistency()?))
}

/// `POST /api/admin/consistency/repair`: re-derive drifted flags, then report again.
pub async fn repair(
    State(ctx): State<ApiContext>,
) -> Result<Json<RepairResponse>, ApiError> {
    let store = ctx.core.store();
    let repaired = store.repair_consistency()?;
    if !repaired.is_empty() {
        tracing::info!(beds = ?repaired, "Occupancy repaired via admin endpoint");
    }
    let report = store.check_consistency()?;
    Ok(Json(RepairResponse { repaired, report }))
}
