use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::enums::EntryStatus;
use crate::errors::DomainError;
use crate::facts::{DomainEvent, SlotDetail};
use crate::period::AcademicPeriod;
use crate::policy::SchedulingPolicy;
use crate::time_slot::TimeSlot;

const ENTITY: &str = "schedule_entry";

/// Input for creating a schedule entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduleEntry {
    pub section_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub room: Option<String>,
    pub slot: TimeSlot,
    pub period: AcademicPeriod,
}

/// Persisted fields, used to rebuild an entry from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntryParts {
    pub id: String,
    pub section_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub room: Option<String>,
    pub slot: TimeSlot,
    pub period: AcademicPeriod,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A subject taught to a class section by a teacher, optionally in a room,
/// in a weekly slot of an academic period.
///
/// Entries are never deleted; cancelling flips the status and removes the
/// entry from conflict checks. Every mutation buffers a [`DomainEvent`] that
/// the unit of work drains with [`ScheduleEntry::take_events`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    id: String,
    section_id: String,
    subject_id: String,
    teacher_id: String,
    room: Option<String>,
    slot: TimeSlot,
    period: AcademicPeriod,
    status: EntryStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

impl ScheduleEntry {
    /// Create a new active entry. Conflict detection is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for empty references, a year outside
    /// the policy window, or an overlong room, and
    /// `DomainError::InvalidTimeSlot` if the slot breaks the policy's bounds.
    pub fn create(
        id: impl Into<String>,
        draft: NewScheduleEntry,
        policy: &SchedulingPolicy,
        current_year: i32,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let id = required("entry id", &id.into())?;
        let section_id = required("section id", &draft.section_id)?;
        let subject_id = required("subject id", &draft.subject_id)?;
        let teacher_id = required("teacher id", &draft.teacher_id)?;
        policy.check_year(draft.period.year, current_year)?;
        check_duration(policy, &draft.slot)?;
        let room = policy.normalize_room(draft.room.as_deref())?;

        let mut entry = Self {
            id,
            section_id,
            subject_id,
            teacher_id,
            room,
            slot: draft.slot,
            period: draft.period,
            status: EntryStatus::Active,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };
        entry.events.push(DomainEvent::ScheduleCreated {
            entry_id: entry.id.clone(),
            section_id: entry.section_id.clone(),
            subject_id: entry.subject_id.clone(),
            teacher_id: entry.teacher_id.clone(),
            room: entry.room.clone(),
            slot: SlotDetail::from(&entry.slot),
            year: entry.period.year,
            term: entry.period.term,
            at: now,
        });
        Ok(entry)
    }

    /// Rebuild from storage.
    ///
    /// Checks structure only. The academic-year window is relative to the
    /// current date, so historical rows stay loadable.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for empty references or a blank room.
    pub fn rehydrate(parts: ScheduleEntryParts) -> Result<Self, DomainError> {
        if parts.room.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(DomainError::Validation(format!(
                "entry {} has a blank room",
                parts.id
            )));
        }
        Ok(Self {
            id: required("entry id", &parts.id)?,
            section_id: required("section id", &parts.section_id)?,
            subject_id: required("subject id", &parts.subject_id)?,
            teacher_id: required("teacher id", &parts.teacher_id)?,
            room: parts.room,
            slot: parts.slot,
            period: parts.period,
            status: parts.status,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            events: Vec::new(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn section_id(&self) -> &str {
        &self.section_id
    }

    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    #[must_use]
    pub fn teacher_id(&self) -> &str {
        &self.teacher_id
    }

    #[must_use]
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    #[must_use]
    pub const fn slot(&self) -> &TimeSlot {
        &self.slot
    }

    #[must_use]
    pub const fn period(&self) -> AcademicPeriod {
        self.period
    }

    #[must_use]
    pub const fn status(&self) -> EntryStatus {
        self.status
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == EntryStatus::Active
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Events buffered since the last [`ScheduleEntry::take_events`].
    #[must_use]
    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_active(&self, action: &str) -> Result<(), DomainError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(DomainError::invalid_operation(
                ENTITY,
                &self.id,
                format!("cannot {action} a cancelled entry"),
            ))
        }
    }

    /// Reassign the teacher. Returns `false` when the teacher is unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if cancelled, `Validation` if the id is empty.
    pub fn change_teacher(&mut self, teacher_id: &str, now: DateTime<Utc>) -> Result<bool, DomainError> {
        self.ensure_active("change the teacher of")?;
        let teacher_id = required("teacher id", teacher_id)?;
        if teacher_id == self.teacher_id {
            return Ok(false);
        }
        let from = std::mem::replace(&mut self.teacher_id, teacher_id);
        self.updated_at = now;
        self.events.push(DomainEvent::TeacherChanged {
            entry_id: self.id.clone(),
            section_id: self.section_id.clone(),
            from,
            to: self.teacher_id.clone(),
            at: now,
        });
        Ok(true)
    }

    /// Move to another room, or to no room. Returns `false` when unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if cancelled, `Validation` if the room is too long.
    pub fn change_room(
        &mut self,
        room: Option<&str>,
        policy: &SchedulingPolicy,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        self.ensure_active("change the room of")?;
        let room = policy.normalize_room(room)?;
        if room == self.room {
            return Ok(false);
        }
        let from = std::mem::replace(&mut self.room, room);
        self.updated_at = now;
        self.events.push(DomainEvent::RoomChanged {
            entry_id: self.id.clone(),
            section_id: self.section_id.clone(),
            from,
            to: self.room.clone(),
            at: now,
        });
        Ok(true)
    }

    /// Move to another slot. Returns `false` when unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if cancelled, `InvalidTimeSlot` if the slot breaks
    /// the policy's duration bounds.
    pub fn change_slot(
        &mut self,
        slot: TimeSlot,
        policy: &SchedulingPolicy,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        self.ensure_active("reschedule")?;
        check_duration(policy, &slot)?;
        if slot == self.slot {
            return Ok(false);
        }
        let from = std::mem::replace(&mut self.slot, slot);
        self.updated_at = now;
        self.events.push(DomainEvent::SlotChanged {
            entry_id: self.id.clone(),
            section_id: self.section_id.clone(),
            from: SlotDetail::from(&from),
            to: SlotDetail::from(&self.slot),
            at: now,
        });
        Ok(true)
    }

    /// Soft-delete. Idempotent: returns `false` if already cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(EntryStatus::Cancelled) {
            return false;
        }
        self.status = EntryStatus::Cancelled;
        self.updated_at = now;
        self.events.push(DomainEvent::ScheduleCancelled {
            entry_id: self.id.clone(),
            section_id: self.section_id.clone(),
            at: now,
        });
        true
    }

    /// Bring a cancelled entry back. The caller re-runs conflict detection first.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the entry is already active.
    pub fn reactivate(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.can_transition_to(EntryStatus::Active) {
            return Err(DomainError::invalid_operation(
                ENTITY,
                &self.id,
                "entry is already active",
            ));
        }
        self.status = EntryStatus::Active;
        self.updated_at = now;
        self.events.push(DomainEvent::ScheduleReactivated {
            entry_id: self.id.clone(),
            section_id: self.section_id.clone(),
            at: now,
        });
        Ok(())
    }
}

fn check_duration(policy: &SchedulingPolicy, slot: &TimeSlot) -> Result<(), DomainError> {
    let minutes = slot.duration_minutes();
    if policy.slot.contains(minutes) {
        Ok(())
    } else {
        Err(DomainError::InvalidTimeSlot(format!(
            "duration {minutes} min is outside {}..={} min",
            policy.slot.min_minutes, policy.slot.max_minutes
        )))
    }
}
