//! Bed board endpoints: current snapshot, occupancy summary, assign and discharge.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AssignBody, BedsResponse, OccupancyResponse};
use crate::models::{AssignRequest, BedAssignment, DischargeRecord};
use crate::realtime::occupancy_summary;

/// `GET /api/beds`: every bed with department, room and occupant.
pub async fn list(State(ctx): State<ApiContext>) -> Json<BedsResponse> {
    Json(BedsResponse {
        beds: ctx.core.synchronizer().snapshot(),
    })
}

/// `GET /api/beds/occupancy`: per-department totals.
pub async fn occupancy(State(ctx): State<ApiContext>) -> Json<OccupancyResponse> {
    let snapshot = ctx.core.synchronizer().snapshot();
    Json(OccupancyResponse {
        departments: occupancy_summary(&snapshot),
    })
}

/// `POST /api/beds/:bed_id/assign`: place a patient in the bed.
pub async fn assign(
    State(ctx): State<ApiContext>,
    Path(bed_id): Path<String>,
    body: Result<Json<AssignBody>, JsonRejection>,
) -> Result<(StatusCode, Json<BedAssignment>), ApiError> {
    let Json(body) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let request = AssignRequest {
        bed_id,
        patient_id: body.patient_id,
        assigned_by: body.assigned_by,
        notes: body.notes,
    };

    let assignment = ctx.core.assignments().assign(&request)?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// `POST /api/beds/:bed_id/discharge`: release the bed's current occupant.
pub async fn discharge(
    State(ctx): State<ApiContext>,
    Path(bed_id): Path<String>,
) -> Result<Json<DischargeRecord>, ApiError> {
    let record = ctx.core.assignments().discharge(&bed_id)?;
    Ok(Json(record))
}
