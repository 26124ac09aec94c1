//! Bed assignment core: precondition checks and the atomic assign/discharge writes.

pub mod error;
pub mod guard;
pub mod transaction;

pub use error::{AssignmentError, ConflictReason, EntityKind};
pub use guard::{validate_assignment, validate_discharge, ValidatedAssignment, ValidatedDischarge};
pub use transaction::AssignmentService;
