//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub department_policy: &'static str,
    pub live_subscriptions: usize,
}

/// `GET /api/health`: liveness check for dashboards.
pub async fn check(
    State(ctx): State<ApiContext>,
) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        department_policy: ctx.core.config.department_policy.as_str(),
        live_subscriptions: ctx.core.store().feed_subscribers(),
    }))
}
