use std::fmt;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::store::CommitError;

/// Entity a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Bed,
    Patient,
    Assignment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bed => "bed",
            Self::Patient => "patient",
            Self::Assignment => "assignment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business rule that blocked an assign or discharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    BedOccupied,
    PatientAssigned,
    DepartmentMismatch,
    PatientWithoutDepartment,
    BedNotOccupied,
    AssignmentClosed,
}

impl ConflictReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::BedOccupied => "bed already occupied",
            Self::PatientAssigned => "patient already assigned",
            Self::DepartmentMismatch => "department mismatch",
            Self::PatientWithoutDepartment => "patient has no department",
            Self::BedNotOccupied => "bed not occupied",
            Self::AssignmentClosed => "assignment already closed",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Terminal outcome of a rejected assign, discharge or history query.
/// Nothing is retried and nothing was written.
#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(EntityKind),

    #[error("{0}")]
    Conflict(ConflictReason),

    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),
}

impl AssignmentError {
    /// Stable machine-readable code, shared with the HTTP error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Store(_) => "INTERNAL",
        }
    }
}

/// Write-time rejections surface the same way the guard reports them.
impl From<CommitError> for AssignmentError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Database(e) => Self::Store(e),
            CommitError::BedNotFound(_) => Self::NotFound(EntityKind::Bed),
            CommitError::BedOccupied(_) => Self::Conflict(ConflictReason::BedOccupied),
            CommitError::PatientAssigned(_) => Self::Conflict(ConflictReason::PatientAssigned),
            CommitError::BedVacant(_) => Self::Conflict(ConflictReason::BedNotOccupied),
            CommitError::AssignmentClosed(_) => Self::Conflict(ConflictReason::AssignmentClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_messages_are_literal() {
        let err = AssignmentError::Conflict(ConflictReason::DepartmentMismatch);
        assert_eq!(err.to_string(), "department mismatch");
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = AssignmentError::NotFound(EntityKind::Patient);
        assert_eq!(err.to_string(), "patient not found");
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn commit_rejections_map_to_conflicts() {
        let err: AssignmentError = CommitError::BedOccupied("B1".into()).into();
        assert!(matches!(err, AssignmentError::Conflict(ConflictReason::BedOccupied)));

        let err: AssignmentError = CommitError::BedNotFound("B1".into()).into();
        assert!(matches!(err, AssignmentError::NotFound(EntityKind::Bed)));

        let err: AssignmentError = CommitError::Database(DatabaseError::LockPoisoned).into();
        assert_eq!(err.code(), "INTERNAL");
    }
}
