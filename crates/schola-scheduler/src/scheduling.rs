//! Schedule entry service.
//!
//! Every mutation follows the same protocol:
//! 1. Validate input that needs no storage (time slot, subject via cache)
//! 2. Begin a write transaction
//! 3. Load the aggregate and section, apply the change
//! 4. Run the conflict detector in the same transaction
//! 5. Write the entry and append its facts to the outbox
//! 6. Commit, or roll back on any error
//!
//! A busy database is retried by re-running steps 2-6.

use std::sync::Arc;

use chrono::{Datelike, NaiveTime, Utc};
use schola_catalog::SubjectLookupCache;
use schola_core::entities::{NewScheduleEntry, ScheduleEntry};
use schola_core::enums::Weekday;
use schola_core::ids::PREFIX_ENTRY;
use schola_core::period::AcademicPeriod;
use schola_core::policy::SchedulingPolicy;
use schola_core::ports::{ClassSectionRepository, FactOutbox, ScheduleRepository, ScheduleStore, UnitOfWork};
use schola_core::retry::RetryPolicy;
use schola_core::time_slot::TimeSlot;

use crate::abandon;
use crate::detector::ConflictDetector;
use crate::error::SchedulingError;
use crate::retry::retrying;

const ENTRY: &str = "schedule_entry";
const SECTION: &str = "class_section";

/// Input for [`SchedulingService::schedule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub section_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub room: Option<String>,
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub period: AcademicPeriod,
}

/// A change to an existing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryChange {
    Teacher(String),
    Room(Option<String>),
    Slot(TimeSlot),
    Cancel,
    Reactivate,
}

impl EntryChange {
    const fn name(&self) -> &'static str {
        match self {
            Self::Teacher(_) => "change_teacher",
            Self::Room(_) => "change_room",
            Self::Slot(_) => "change_slot",
            Self::Cancel => "cancel",
            Self::Reactivate => "reactivate",
        }
    }
}

/// Creates and edits schedule entries without double-booking.
pub struct SchedulingService<S> {
    store: S,
    subjects: Arc<SubjectLookupCache>,
    policy: SchedulingPolicy,
    retry: RetryPolicy,
    detector: ConflictDetector,
    current_year: Option<i32>,
}

impl<S: ScheduleStore> SchedulingService<S> {
    #[must_use]
    pub fn new(store: S, subjects: Arc<SubjectLookupCache>, policy: SchedulingPolicy) -> Self {
        Self {
            store,
            subjects,
            policy,
            retry: RetryPolicy::default(),
            detector: ConflictDetector,
            current_year: None,
        }
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pin the year the academic-year window is centred on.
    #[must_use]
    pub const fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn current_year(&self) -> i32 {
        self.current_year.unwrap_or_else(|| Utc::now().year())
    }

    /// Confirm the subject exists and is active. Fails closed when the
    /// catalog cannot answer.
    async fn check_subject(&self, subject_id: &str) -> Result<(), SchedulingError> {
        let lookup = self
            .subjects
            .lookup(subject_id)
            .await
            .map_err(|e| SchedulingError::subject_unavailable(subject_id, &e))?;
        if !lookup.exists {
            return Err(SchedulingError::not_found("subject", subject_id));
        }
        if !lookup.active {
            return Err(SchedulingError::Validation(format!(
                "subject {subject_id} is inactive"
            )));
        }
        Ok(())
    }

    /// Load the section an entry belongs to and check it can host `slot`.
    async fn check_section(
        &self,
        tx: &S::Tx,
        section_id: &str,
        slot: &TimeSlot,
        period: AcademicPeriod,
    ) -> Result<(), SchedulingError> {
        let section = tx
            .load_section(section_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(SECTION, section_id))?;
        if !section.is_active() {
            return Err(SchedulingError::invalid_operation(
                SECTION,
                section_id,
                "section is inactive",
            ));
        }
        if section.year() != period.year {
            return Err(SchedulingError::Validation(format!(
                "section {section_id} belongs to {}, not {}",
                section.year(),
                period.year
            )));
        }
        self.policy.check_shift(section.shift(), slot)?;
        Ok(())
    }

    /// Detect conflicts for `entry`, then write it with its facts.
    async fn write_checked(
        &self,
        tx: &S::Tx,
        entry: &mut ScheduleEntry,
        insert: bool,
    ) -> Result<(), SchedulingError> {
        let report = self.detector.check(tx, entry, Some(entry.id())).await?;
        if report.has_conflict() {
            tracing::warn!(entry_id = entry.id(), %report, "schedule rejected");
            return Err(SchedulingError::Conflict(report));
        }
        if insert {
            tx.insert_entry(entry).await?;
        } else {
            tx.update_entry(entry).await?;
        }
        tx.append_facts(&entry.take_events()).await?;
        Ok(())
    }

    /// Create a new active entry.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad slot, year, room, shift or inactive subject;
    /// `NotFound` for an unknown section or subject; `SubjectUnavailable`
    /// when the catalog times out; `Conflict` when teacher, room or section is
    /// already booked.
    pub async fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleEntry, SchedulingError> {
        let slot = TimeSlot::with_bounds(request.day, request.start, request.end, &self.policy.slot)?;
        self.check_subject(&request.subject_id).await?;
        let entry = retrying(&self.retry, "schedule", || self.try_schedule(request, slot)).await?;
        tracing::info!(
            entry_id = entry.id(),
            section_id = entry.section_id(),
            teacher_id = entry.teacher_id(),
            slot = %entry.slot(),
            "schedule entry created"
        );
        Ok(entry)
    }

    async fn try_schedule(
        &self,
        request: &ScheduleRequest,
        slot: TimeSlot,
    ) -> Result<ScheduleEntry, SchedulingError> {
        let tx = self.store.begin().await?;
        match self.schedule_in(&tx, request, slot).await {
            Ok(entry) => {
                tx.commit().await?;
                Ok(entry)
            }
            Err(e) => Err(abandon(tx, e).await),
        }
    }

    async fn schedule_in(
        &self,
        tx: &S::Tx,
        request: &ScheduleRequest,
        slot: TimeSlot,
    ) -> Result<ScheduleEntry, SchedulingError> {
        self.check_section(tx, &request.section_id, &slot, request.period)
            .await?;
        let id = tx.generate_id(PREFIX_ENTRY).await?;
        let draft = NewScheduleEntry {
            section_id: request.section_id.clone(),
            subject_id: request.subject_id.clone(),
            teacher_id: request.teacher_id.clone(),
            room: request.room.clone(),
            slot,
            period: request.period,
        };
        let mut entry = ScheduleEntry::create(id, draft, &self.policy, self.current_year(), Utc::now())?;
        self.write_checked(tx, &mut entry, true).await?;
        Ok(entry)
    }

    /// Assign a different teacher.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the entry is cancelled, `Conflict` if the new
    /// teacher is busy.
    pub async fn change_teacher(&self, entry_id: &str, teacher_id: &str) -> Result<ScheduleEntry, SchedulingError> {
        self.apply(entry_id, &EntryChange::Teacher(teacher_id.to_string()))
            .await
    }

    /// Move to another room, or to no room.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the entry is cancelled, `Validation` for an
    /// overlong room, `Conflict` if the room is taken.
    pub async fn change_room(&self, entry_id: &str, room: Option<&str>) -> Result<ScheduleEntry, SchedulingError> {
        self.apply(entry_id, &EntryChange::Room(room.map(str::to_string)))
            .await
    }

    /// Move to another slot.
    ///
    /// # Errors
    ///
    /// `Validation` for a slot outside the bounds or the section's shift,
    /// `InvalidOperation` if cancelled, `Conflict` if anything is busy then.
    pub async fn change_slot(
        &self,
        entry_id: &str,
        day: Weekday,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<ScheduleEntry, SchedulingError> {
        let slot = TimeSlot::with_bounds(day, start, end, &self.policy.slot)?;
        self.apply(entry_id, &EntryChange::Slot(slot)).await
    }

    /// Cancel the entry. Cancelling a cancelled entry is a no-op.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown entry.
    pub async fn cancel(&self, entry_id: &str) -> Result<ScheduleEntry, SchedulingError> {
        self.apply(entry_id, &EntryChange::Cancel).await
    }

    /// Bring a cancelled entry back, re-checking conflicts first.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if already active or the section is inactive,
    /// `Conflict` if the slot has been taken since.
    pub async fn reactivate(&self, entry_id: &str) -> Result<ScheduleEntry, SchedulingError> {
        self.apply(entry_id, &EntryChange::Reactivate).await
    }

    /// Apply one change to an existing entry.
    ///
    /// # Errors
    ///
    /// See the individual operations.
    pub async fn apply(&self, entry_id: &str, change: &EntryChange) -> Result<ScheduleEntry, SchedulingError> {
        let op = change.name();
        let (entry, changed) = retrying(&self.retry, op, || self.try_apply(entry_id, change)).await?;
        if changed {
            tracing::info!(entry_id, op, status = %entry.status(), "schedule entry updated");
        } else {
            tracing::debug!(entry_id, op, "no change");
        }
        Ok(entry)
    }

    async fn try_apply(
        &self,
        entry_id: &str,
        change: &EntryChange,
    ) -> Result<(ScheduleEntry, bool), SchedulingError> {
        let tx = self.store.begin().await?;
        match self.apply_in(&tx, entry_id, change).await {
            Ok((entry, true)) => {
                tx.commit().await?;
                Ok((entry, true))
            }
            Ok((entry, false)) => {
                tx.rollback().await?;
                Ok((entry, false))
            }
            Err(e) => Err(abandon(tx, e).await),
        }
    }

    async fn apply_in(
        &self,
        tx: &S::Tx,
        entry_id: &str,
        change: &EntryChange,
    ) -> Result<(ScheduleEntry, bool), SchedulingError> {
        let mut entry = tx
            .get_entry(entry_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(ENTRY, entry_id))?;
        let now = Utc::now();

        let changed = match change {
            EntryChange::Teacher(teacher) => entry.change_teacher(teacher, now)?,
            EntryChange::Room(room) => entry.change_room(room.as_deref(), &self.policy, now)?,
            EntryChange::Slot(slot) => {
                if entry.is_active() {
                    self.check_section(tx, entry.section_id(), slot, entry.period())
                        .await?;
                }
                entry.change_slot(*slot, &self.policy, now)?
            }
            EntryChange::Cancel => entry.cancel(now),
            EntryChange::Reactivate => {
                if entry.is_active() {
                    return Err(SchedulingError::invalid_operation(
                        ENTRY,
                        entry_id,
                        "entry is already active",
                    ));
                }
                let (section_id, slot, period) = (entry.section_id().to_string(), *entry.slot(), entry.period());
                self.check_section(tx, &section_id, &slot, period).await?;
                entry.reactivate(now)?;
                true
            }
        };
        if !changed {
            return Ok((entry, false));
        }

        if matches!(change, EntryChange::Cancel) {
            tx.update_entry(&entry).await?;
            tx.append_facts(&entry.take_events()).await?;
        } else {
            self.write_checked(tx, &mut entry, false).await?;
        }
        Ok((entry, true))
    }

    /// Read one entry.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown entry.
    pub async fn get_entry(&self, entry_id: &str) -> Result<ScheduleEntry, SchedulingError> {
        let tx = self.store.begin().await?;
        let found = tx.get_entry(entry_id).await;
        tx.rollback().await?;
        found?.ok_or_else(|| SchedulingError::not_found(ENTRY, entry_id))
    }
}
