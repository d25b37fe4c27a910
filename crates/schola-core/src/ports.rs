//! Persistence and publication ports.
//!
//! The scheduling services depend only on these traits. A unit of work is a
//! single write-serialized transaction that exposes every repository plus the
//! fact outbox; nothing it writes is visible until `commit`, and dropping it
//! without committing discards its writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::entities::{ClassSection, ScheduleEntry};
use crate::enums::ConflictKind;
use crate::facts::{DomainEvent, StoredFact};
use crate::period::AcademicPeriod;

/// Errors raised by storage adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The storage backstop rejected an overlapping active entry.
    #[error("Storage rejected a {kind} double-booking")]
    Conflict { kind: ConflictKind },

    /// The row changed since it was loaded.
    #[error("Version mismatch on {entity} {id}: expected version {expected}")]
    VersionMismatch {
        entity: String,
        id: String,
        expected: i64,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// The storage capacity guard refused a roster that exceeds capacity.
    #[error("Storage rejected roster of section {section_id}: capacity exceeded")]
    CapacityExceeded { section_id: String },

    /// The database is locked by another writer.
    #[error("Storage busy: {0}")]
    Busy(String),

    /// Some other integrity constraint fired.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Whether re-running the whole unit of work may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionMismatch { .. } | Self::Busy(_))
    }
}

/// Schedule entries, always read and written inside the caller's transaction.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn get_entry(&self, id: &str) -> Result<Option<ScheduleEntry>, StoreError>;

    async fn find_active_by_teacher(
        &self,
        teacher_id: &str,
        period: AcademicPeriod,
    ) -> Result<Vec<ScheduleEntry>, StoreError>;

    async fn find_active_by_room(
        &self,
        room: &str,
        period: AcademicPeriod,
    ) -> Result<Vec<ScheduleEntry>, StoreError>;

    async fn find_active_by_section(
        &self,
        section_id: &str,
        period: AcademicPeriod,
    ) -> Result<Vec<ScheduleEntry>, StoreError>;

    async fn insert_entry(&self, entry: &ScheduleEntry) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// `NotFound` if the entry does not exist.
    async fn update_entry(&self, entry: &ScheduleEntry) -> Result<(), StoreError>;
}

/// Class sections and their active rosters.
#[async_trait]
pub trait ClassSectionRepository: Send + Sync {
    async fn load_section(&self, id: &str) -> Result<Option<ClassSection>, StoreError>;

    async fn insert_section(&self, section: &ClassSection) -> Result<(), StoreError>;

    /// Persist the section and its roster if the stored version still equals
    /// `section.version()`. Returns the new version.
    ///
    /// # Errors
    ///
    /// `VersionMismatch` when another writer saved first.
    async fn save_section(&self, section: &ClassSection) -> Result<i64, StoreError>;
}

/// Transactional outbox for domain facts.
#[async_trait]
pub trait FactOutbox: Send + Sync {
    /// Append facts in order. Returns their ids.
    async fn append_facts(&self, events: &[DomainEvent]) -> Result<Vec<String>, StoreError>;
}

/// One write-serialized transaction.
#[async_trait]
pub trait UnitOfWork: ScheduleRepository + ClassSectionRepository + FactOutbox + Sized {
    /// Generate a fresh `<prefix>-xxxxxxxx` id.
    async fn generate_id(&self, prefix: &str) -> Result<String, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Entry point that opens units of work.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    type Tx: UnitOfWork;

    /// Open a write transaction.
    ///
    /// # Errors
    ///
    /// `Busy` if another writer holds the lock past the busy timeout.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// Read side of the outbox, drained by the relay.
#[async_trait]
pub trait FactFeed: Send + Sync {
    /// Undelivered facts in outbox order, oldest first.
    async fn pending_facts(&self, limit: usize) -> Result<Vec<StoredFact>, StoreError>;

    async fn mark_delivered(&self, fact_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// A subscriber refused or failed to handle a fact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Subscriber {subscriber} failed on fact {fact_id}: {reason}")]
pub struct SubscriberError {
    pub subscriber: String,
    pub fact_id: String,
    pub reason: String,
}

/// Consumer of committed facts. Delivery is at-least-once, so `deliver`
/// must tolerate seeing the same fact id twice.
#[async_trait]
pub trait FactSubscriber: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, fact: &StoredFact) -> Result<(), SubscriberError>;
}
