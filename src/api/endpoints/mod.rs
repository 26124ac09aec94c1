//! API endpoint handlers.
//!
//! Handlers are thin: they parse the request, call the assignment core or the
//! synchronizer, and map errors through `ApiError`.

pub mod admin;
pub mod beds;
pub mod health;
pub mod history;
