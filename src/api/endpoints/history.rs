//! Assignment history endpoints, most recent first.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, HistoryResponse};

/// `GET /api/beds/:bed_id/history`
pub async fn by_bed(
    State(ctx): State<ApiContext>,
    Path(bed_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let assignments = ctx.core.assignments().history_by_bed(&bed_id)?;
    Ok(Json(HistoryResponse { assignments }))
}

/// `GET /api/patients/:patient_id/history`
pub async fn by_patient(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let assignments = ctx.core.assignments().history_by_patient(&patient_id)?;
    Ok(Json(HistoryResponse { assignments }))
}
