//! Caller-facing error vocabulary.

use schola_catalog::CatalogError;
use schola_core::conflict::ConflictReport;
use schola_core::errors::DomainError;
use schola_core::ports::StoreError;
use thiserror::Error;

/// Every failure a scheduling or enrollment operation can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// One or more resources are double-booked.
    #[error("Schedule conflict: {0}")]
    Conflict(ConflictReport),

    #[error("Section {section_id} is at capacity")]
    CapacityExceeded { section_id: String },

    /// The catalog could not confirm the subject in time. Retryable.
    #[error("Subject {subject_id} unavailable: {reason}")]
    SubjectUnavailable { subject_id: String, reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("Student {student_id} is not enrolled in section {section_id}")]
    NotEnrolled {
        section_id: String,
        student_id: String,
    },

    #[error("Invalid operation on {entity} {id}: {reason}")]
    InvalidOperation {
        entity: String,
        id: String,
        reason: String,
    },

    #[error("Storage failure: {message}")]
    Storage { message: String, retryable: bool },
}

impl SchedulingError {
    pub(crate) fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_operation(entity: &str, id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            entity: entity.to_string(),
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn subject_unavailable(subject_id: &str, err: &CatalogError) -> Self {
        Self::SubjectUnavailable {
            subject_id: subject_id.to_string(),
            reason: err.to_string(),
        }
    }

    /// Whether the caller may retry the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SubjectUnavailable { .. } | Self::Storage { retryable: true, .. }
        )
    }

    /// Whether re-running the unit of work may succeed.
    pub(crate) const fn is_transient_storage(&self) -> bool {
        matches!(self, Self::Storage { retryable: true, .. })
    }

    /// The conflict report, if this is a conflict.
    #[must_use]
    pub const fn conflict(&self) -> Option<&ConflictReport> {
        match self {
            Self::Conflict(report) => Some(report),
            _ => None,
        }
    }
}

impl From<DomainError> for SchedulingError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidTimeSlot(_) | DomainError::InvalidCapacity { .. } => {
                Self::Validation(e.to_string())
            }
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::InvalidOperation { entity, id, reason } => {
                Self::InvalidOperation { entity, id, reason }
            }
            DomainError::CapacityExceeded { section_id, .. } => Self::CapacityExceeded { section_id },
            DomainError::NotEnrolled {
                section_id,
                student_id,
            } => Self::NotEnrolled {
                section_id,
                student_id,
            },
        }
    }
}

impl From<StoreError> for SchedulingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { kind } => Self::Conflict(ConflictReport::from_backstop(kind)),
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::CapacityExceeded { section_id } => Self::CapacityExceeded { section_id },
            other => Self::Storage {
                retryable: other.is_retryable(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use schola_core::enums::ConflictKind;

    #[test]
    fn backstop_becomes_conflict() {
        let err = SchedulingError::from(StoreError::Conflict {
            kind: ConflictKind::Room,
        });
        assert_eq!(err.conflict().unwrap().kinds(), vec![ConflictKind::Room]);
        assert!(!err.is_retryable());
    }

    #[rstest]
    #[case::busy(StoreError::Busy("database is locked".into()), true)]
    #[case::stale_version(
        StoreError::VersionMismatch {
            entity: "class_section".into(),
            id: "sec-1".into(),
            expected: 2,
        },
        true
    )]
    #[case::constraint(StoreError::Constraint("NOT NULL".into()), false)]
    #[case::corrupt(StoreError::Corrupt("bad weekday 9".into()), false)]
    fn storage_failures_carry_retryability(#[case] store: StoreError, #[case] retryable: bool) {
        let err = SchedulingError::from(store);
        assert!(matches!(err, SchedulingError::Storage { .. }));
        assert_eq!(err.is_retryable(), retryable);
        assert_eq!(err.is_transient_storage(), retryable);
    }

    #[test]
    fn domain_errors_keep_their_kind() {
        let err = SchedulingError::from(DomainError::InvalidTimeSlot("start after end".into()));
        assert!(matches!(err, SchedulingError::Validation(_)));
        let err = SchedulingError::from(DomainError::CapacityExceeded {
            section_id: "sec-1".into(),
            capacity: 30,
        });
        assert_eq!(
            err,
            SchedulingError::CapacityExceeded {
                section_id: "sec-1".into()
            }
        );
        let err = SchedulingError::from(DomainError::NotEnrolled {
            section_id: "sec-1".into(),
            student_id: "stu-9".into(),
        });
        assert_eq!(
            err,
            SchedulingError::NotEnrolled {
                section_id: "sec-1".into(),
                student_id: "stu-9".into(),
            }
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn subject_unavailable_is_retryable() {
        let err = SchedulingError::subject_unavailable(
            "sub-1",
            &CatalogError::Timeout(std::time::Duration::from_secs(2)),
        );
        assert!(err.is_retryable());
    }
}
