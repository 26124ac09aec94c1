//! Bed board API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! JSON routes are nested under `/api/`; the snapshot stream lives at `/ws/beds`.

use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::api::websocket;
use crate::core_state::CoreState;

/// Build the bed board router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/beds", get(endpoints::beds::list))
        .route("/beds/occupancy", get(endpoints::beds::occupancy))
        .route("/beds/:bed_id/assign", post(endpoints::beds::assign))
        .route("/beds/:bed_id/discharge", post(endpoints::beds::discharge))
        .route("/beds/:bed_id/history", get(endpoints::history::by_bed))
        .route(
            "/patients/:patient_id/history",
            get(endpoints::history::by_patient),
        )
        .route("/admin/consistency", get(endpoints::admin::check))
        .route("/admin/consistency/repair", post(endpoints::admin::repair))
        .with_state(ctx.clone());

    let ws_routes = Router::new()
        .route("/ws/beds", get(websocket::ws_upgrade))
        .with_state(ctx);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .nest("/api", api)
        .merge(ws_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
