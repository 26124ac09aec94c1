//! HTTP and WebSocket surface of the bed board.
//!
//! JSON endpoints under `/api/` expose the assignment core; `/ws/beds`
//! streams synchronizer snapshots to dashboards. `api_router()` returns a
//! `Router` that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;
pub mod websocket;

pub use router::api_router;
pub use server::{start_server, ApiServer, ApiSession};
pub use types::ApiContext;
