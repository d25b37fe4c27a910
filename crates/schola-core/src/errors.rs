//! Domain error types for Schola.
//!
//! Raised by value objects and aggregates. Storage failures live in
//! `ports::StoreError`; the scheduling services translate both into a single
//! caller-facing vocabulary.

use thiserror::Error;

/// Errors raised by value objects and aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A time slot violates ordering, duration or day rules.
    #[error("Invalid time slot: {0}")]
    InvalidTimeSlot(String),

    /// Input failed validation (year, term, room, capacity, names).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation is not allowed in the aggregate's current state.
    #[error("Invalid operation on {entity} {id}: {reason}")]
    InvalidOperation {
        entity: String,
        id: String,
        reason: String,
    },

    /// The section is full.
    #[error("Capacity exceeded: section {section_id} is at capacity {capacity}")]
    CapacityExceeded { section_id: String, capacity: u32 },

    /// Unenroll was requested for a student without an active enrollment.
    #[error("Student {student_id} is not enrolled in section {section_id}")]
    NotEnrolled {
        section_id: String,
        student_id: String,
    },

    /// A capacity change would break `0 < capacity` or `enrolled <= capacity`.
    #[error("Invalid capacity {requested} for section {section_id} ({enrolled} enrolled)")]
    InvalidCapacity {
        section_id: String,
        requested: i64,
        enrolled: u32,
    },
}

impl DomainError {
    pub(crate) fn invalid_operation(
        entity: &str,
        id: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOperation {
            entity: entity.to_string(),
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the caller must correct its input (never retried automatically).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTimeSlot(_) | Self::Validation(_) | Self::InvalidCapacity { .. }
        )
    }
}
