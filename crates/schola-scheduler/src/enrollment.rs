//! Class section and roster service.
//!
//! Sections are saved with an optimistic version check. A stale version
//! means another writer saved the section first; the whole load-mutate-save
//! cycle is retried with backoff against the fresh row.

use chrono::{Datelike, Utc};
use schola_core::entities::ClassSection;
use schola_core::enums::Shift;
use schola_core::errors::DomainError;
use schola_core::ids::PREFIX_SECTION;
use schola_core::policy::SchedulingPolicy;
use schola_core::ports::{ClassSectionRepository, FactOutbox, ScheduleStore, UnitOfWork};
use schola_core::retry::RetryPolicy;

use crate::abandon;
use crate::error::SchedulingError;
use crate::retry::retrying;

const SECTION: &str = "class_section";

/// A change to a section or its roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionChange {
    Enroll(String),
    Unenroll(String),
    Capacity(i64),
    Activate,
    Deactivate,
}

impl SectionChange {
    const fn name(&self) -> &'static str {
        match self {
            Self::Enroll(_) => "enroll",
            Self::Unenroll(_) => "unenroll",
            Self::Capacity(_) => "change_capacity",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
        }
    }
}

/// Outcome of one attempt.
enum Applied {
    Saved(ClassSection),
    Unchanged(ClassSection),
    /// The section was full; the attempt fact still has to be committed.
    Refused(SchedulingError),
}

pub struct EnrollmentService<S> {
    store: S,
    policy: SchedulingPolicy,
    retry: RetryPolicy,
    current_year: Option<i32>,
}

impl<S: ScheduleStore> EnrollmentService<S> {
    #[must_use]
    pub fn new(store: S, policy: SchedulingPolicy) -> Self {
        Self {
            store,
            policy,
            retry: RetryPolicy::default(),
            current_year: None,
        }
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    /// Create an empty active section.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty name, a non-positive capacity or a year
    /// outside the policy window.
    pub async fn create_section(
        &self,
        name: &str,
        capacity: i64,
        year: i32,
        shift: Shift,
    ) -> Result<ClassSection, SchedulingError> {
        let current = self.current_year.unwrap_or_else(|| Utc::now().year());
        self.policy.check_year(year, current)?;
        let section = retrying(&self.retry, "create_section", || async {
            let tx = self.store.begin().await?;
            let created = async {
                let id = tx.generate_id(PREFIX_SECTION).await?;
                let section = ClassSection::new(id, name, capacity, year, shift, Utc::now())?;
                tx.insert_section(&section).await?;
                Ok::<_, SchedulingError>(section)
            }
            .await;
            match created {
                Ok(section) => {
                    tx.commit().await?;
                    Ok(section)
                }
                Err(e) => Err(abandon(tx, e).await),
            }
        })
        .await?;
        tracing::info!(section_id = section.id(), capacity, year, %shift, "section created");
        Ok(section)
    }

    /// Enroll a student.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` when the section is full (a capacity-exceeded
    /// attempt fact is still recorded), `InvalidOperation` for an inactive
    /// section or a duplicate enrollment.
    pub async fn enroll(&self, section_id: &str, student_id: &str) -> Result<ClassSection, SchedulingError> {
        self.apply(section_id, &SectionChange::Enroll(student_id.to_string()))
            .await
    }

    /// # Errors
    ///
    /// `NotEnrolled` if the student is not enrolled, `NotFound` for an
    /// unknown section.
    pub async fn unenroll(&self, section_id: &str, student_id: &str) -> Result<ClassSection, SchedulingError> {
        self.apply(section_id, &SectionChange::Unenroll(student_id.to_string()))
            .await
    }

    /// # Errors
    ///
    /// `Validation` if the capacity is not positive or below enrollment.
    pub async fn change_capacity(&self, section_id: &str, capacity: i64) -> Result<ClassSection, SchedulingError> {
        self.apply(section_id, &SectionChange::Capacity(capacity)).await
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown section.
    pub async fn activate(&self, section_id: &str) -> Result<ClassSection, SchedulingError> {
        self.apply(section_id, &SectionChange::Activate).await
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown section.
    pub async fn deactivate(&self, section_id: &str) -> Result<ClassSection, SchedulingError> {
        self.apply(section_id, &SectionChange::Deactivate).await
    }

    /// Apply one change with version-mismatch retries.
    ///
    /// # Errors
    ///
    /// See the individual operations.
    pub async fn apply(&self, section_id: &str, change: &SectionChange) -> Result<ClassSection, SchedulingError> {
        let op = change.name();
        match retrying(&self.retry, op, || self.try_apply(section_id, change)).await? {
            Applied::Saved(section) => {
                tracing::info!(
                    section_id,
                    op,
                    enrolled = section.enrolled_count(),
                    capacity = section.capacity(),
                    version = section.version(),
                    "section updated"
                );
                Ok(section)
            }
            Applied::Unchanged(section) => Ok(section),
            Applied::Refused(err) => {
                tracing::warn!(section_id, op, error = %err, "enrollment refused");
                Err(err)
            }
        }
    }

    async fn try_apply(&self, section_id: &str, change: &SectionChange) -> Result<Applied, SchedulingError> {
        let tx = self.store.begin().await?;
        match self.apply_in(&tx, section_id, change).await {
            Ok(Applied::Unchanged(section)) => {
                tx.rollback().await?;
                Ok(Applied::Unchanged(section))
            }
            Ok(applied) => {
                tx.commit().await?;
                Ok(applied)
            }
            Err(e) => Err(abandon(tx, e).await),
        }
    }

    async fn apply_in(
        &self,
        tx: &S::Tx,
        section_id: &str,
        change: &SectionChange,
    ) -> Result<Applied, SchedulingError> {
        let mut section = tx
            .load_section(section_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(SECTION, section_id))?;
        let now = Utc::now();

        let changed = match change {
            SectionChange::Enroll(student) => match section.enroll(student, now) {
                Ok(()) => true,
                Err(e @ DomainError::CapacityExceeded { .. }) => {
                    tx.append_facts(&[section.capacity_exceeded_attempt(student, now)])
                        .await?;
                    return Ok(Applied::Refused(e.into()));
                }
                Err(e) => return Err(e.into()),
            },
            SectionChange::Unenroll(student) => {
                section.unenroll(student, now)?;
                true
            }
            SectionChange::Capacity(capacity) => section.change_capacity(*capacity, now)?,
            SectionChange::Activate => section.activate(now),
            SectionChange::Deactivate => section.deactivate(now),
        };
        if !changed {
            return Ok(Applied::Unchanged(section));
        }

        let version = tx.save_section(&section).await?;
        tx.append_facts(&section.take_events()).await?;
        let reloaded = tx
            .load_section(section_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(SECTION, section_id))?;
        debug_assert_eq!(reloaded.version(), version);
        Ok(Applied::Saved(reloaded))
    }

    /// Read one section.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown section.
    pub async fn get_section(&self, section_id: &str) -> Result<ClassSection, SchedulingError> {
        let tx = self.store.begin().await?;
        let found = tx.load_section(section_id).await;
        tx.rollback().await?;
        found?.ok_or_else(|| SchedulingError::not_found(SECTION, section_id))
    }
}
