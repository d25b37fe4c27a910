//! Domain facts published by the scheduling core.
//!
//! Aggregates buffer `DomainEvent`s while they mutate; the unit of work writes
//! them to the outbox in the same transaction as the state change. Once
//! persisted each fact becomes a `StoredFact` with a stable id and a
//! monotonically increasing sequence number, which subscribers use to
//! deduplicate redeliveries.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{FactKind, Term, Weekday};
use crate::time_slot::{TimeSlot, format_hhmm};

/// Serializable copy of a `TimeSlot` for fact payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SlotDetail {
    pub day: Weekday,
    /// `HH:MM`
    pub start: String,
    /// `HH:MM`
    pub end: String,
}

impl From<&TimeSlot> for SlotDetail {
    fn from(slot: &TimeSlot) -> Self {
        Self {
            day: slot.day(),
            start: format_hhmm(slot.start()),
            end: format_hhmm(slot.end()),
        }
    }
}

/// A fact raised by an aggregate mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    ScheduleCreated {
        entry_id: String,
        section_id: String,
        subject_id: String,
        teacher_id: String,
        room: Option<String>,
        slot: SlotDetail,
        year: i32,
        term: Term,
        at: DateTime<Utc>,
    },
    ScheduleCancelled {
        entry_id: String,
        section_id: String,
        at: DateTime<Utc>,
    },
    ScheduleReactivated {
        entry_id: String,
        section_id: String,
        at: DateTime<Utc>,
    },
    TeacherChanged {
        entry_id: String,
        section_id: String,
        from: String,
        to: String,
        at: DateTime<Utc>,
    },
    RoomChanged {
        entry_id: String,
        section_id: String,
        from: Option<String>,
        to: Option<String>,
        at: DateTime<Utc>,
    },
    SlotChanged {
        entry_id: String,
        section_id: String,
        from: SlotDetail,
        to: SlotDetail,
        at: DateTime<Utc>,
    },
    StudentEnrolled {
        section_id: String,
        student_id: String,
        /// Active enrollment after the change.
        enrolled: u32,
        at: DateTime<Utc>,
    },
    StudentUnenrolled {
        section_id: String,
        student_id: String,
        enrolled: u32,
        at: DateTime<Utc>,
    },
    CapacityChanged {
        section_id: String,
        from: u32,
        to: u32,
        at: DateTime<Utc>,
    },
    /// An enrollment was refused because the section was full.
    CapacityExceededAttempt {
        section_id: String,
        student_id: String,
        capacity: u32,
        at: DateTime<Utc>,
    },
}

impl DomainEvent {
    #[must_use]
    pub const fn kind(&self) -> FactKind {
        match self {
            Self::ScheduleCreated { .. } => FactKind::ScheduleCreated,
            Self::ScheduleCancelled { .. } => FactKind::ScheduleCancelled,
            Self::ScheduleReactivated { .. } => FactKind::ScheduleReactivated,
            Self::TeacherChanged { .. } => FactKind::TeacherChanged,
            Self::RoomChanged { .. } => FactKind::RoomChanged,
            Self::SlotChanged { .. } => FactKind::SlotChanged,
            Self::StudentEnrolled { .. } => FactKind::StudentEnrolled,
            Self::StudentUnenrolled { .. } => FactKind::StudentUnenrolled,
            Self::CapacityChanged { .. } => FactKind::CapacityChanged,
            Self::CapacityExceededAttempt { .. } => FactKind::CapacityExceededAttempt,
        }
    }

    /// Id of the aggregate the fact is about: the entry for schedule facts,
    /// the section for roster facts.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        match self {
            Self::ScheduleCreated { entry_id, .. }
            | Self::ScheduleCancelled { entry_id, .. }
            | Self::ScheduleReactivated { entry_id, .. }
            | Self::TeacherChanged { entry_id, .. }
            | Self::RoomChanged { entry_id, .. }
            | Self::SlotChanged { entry_id, .. } => entry_id,
            Self::StudentEnrolled { section_id, .. }
            | Self::StudentUnenrolled { section_id, .. }
            | Self::CapacityChanged { section_id, .. }
            | Self::CapacityExceededAttempt { section_id, .. } => section_id,
        }
    }

    #[must_use]
    pub fn section_id(&self) -> &str {
        match self {
            Self::ScheduleCreated { section_id, .. }
            | Self::ScheduleCancelled { section_id, .. }
            | Self::ScheduleReactivated { section_id, .. }
            | Self::TeacherChanged { section_id, .. }
            | Self::RoomChanged { section_id, .. }
            | Self::SlotChanged { section_id, .. }
            | Self::StudentEnrolled { section_id, .. }
            | Self::StudentUnenrolled { section_id, .. }
            | Self::CapacityChanged { section_id, .. }
            | Self::CapacityExceededAttempt { section_id, .. } => section_id,
        }
    }

    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::ScheduleCreated { at, .. }
            | Self::ScheduleCancelled { at, .. }
            | Self::ScheduleReactivated { at, .. }
            | Self::TeacherChanged { at, .. }
            | Self::RoomChanged { at, .. }
            | Self::SlotChanged { at, .. }
            | Self::StudentEnrolled { at, .. }
            | Self::StudentUnenrolled { at, .. }
            | Self::CapacityChanged { at, .. }
            | Self::CapacityExceededAttempt { at, .. } => *at,
        }
    }
}

/// A fact as read back from the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoredFact {
    /// Stable id (`fct-xxxxxxxx`), the deduplication key for subscribers.
    pub id: String,
    /// Outbox order. Strictly increasing across commits.
    pub seq: i64,
    pub kind: FactKind,
    pub entity_id: String,
    pub section_id: String,
    pub occurred_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub payload: DomainEvent,
}
