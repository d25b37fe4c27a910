//! Database error types for schola-db.

use schola_core::enums::ConflictKind;
use schola_core::errors::DomainError;
use schola_core::ports::StoreError;
use thiserror::Error;

/// Message prefix raised by the overlap triggers.
pub const BACKSTOP_PREFIX: &str = "schedule_conflict:";
/// Message raised by the enrollment capacity trigger.
pub const CAPACITY_EXCEEDED: &str = "capacity_exceeded";
/// Message raised when a capacity drop would strand enrolled students.
pub const INVALID_CAPACITY: &str = "invalid_capacity";

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or returned unusable data.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// A stored row violates a domain invariant.
    #[error("Invalid stored data: {0}")]
    InvalidState(#[from] DomainError),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Conflict kind named by a backstop trigger message, if any.
#[must_use]
pub fn backstop_kind(message: &str) -> Option<ConflictKind> {
    let rest = &message[message.find(BACKSTOP_PREFIX)? + BACKSTOP_PREFIX.len()..];
    let word: String = rest.chars().take_while(char::is_ascii_lowercase).collect();
    word.parse().ok()
}

/// Whether a libSQL error means another writer holds the lock.
#[must_use]
pub fn is_busy(message: &str) -> bool {
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("SQLITE_BUSY")
        || message.contains("SQLITE_LOCKED")
}

impl From<DatabaseError> for StoreError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::LibSql(inner) => {
                let msg = inner.to_string();
                if let Some(kind) = backstop_kind(&msg) {
                    Self::Conflict { kind }
                } else if msg.contains(CAPACITY_EXCEEDED) {
                    Self::CapacityExceeded {
                        section_id: String::new(),
                    }
                } else if msg.contains(INVALID_CAPACITY) {
                    Self::Constraint("capacity below active enrollment".into())
                } else if is_busy(&msg) {
                    Self::Busy(msg)
                } else if msg.contains("constraint failed") {
                    Self::Constraint(msg)
                } else {
                    Self::Backend(msg)
                }
            }
            DatabaseError::InvalidState(d) => Self::Corrupt(d.to_string()),
            DatabaseError::Query(m) => Self::Corrupt(m),
            other => Self::Backend(other.to_string()),
        }
    }
}
