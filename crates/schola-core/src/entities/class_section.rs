use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::enums::Shift;
use crate::errors::DomainError;
use crate::facts::DomainEvent;

const ENTITY: &str = "class_section";

/// Persisted fields, used to rebuild a section from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSectionParts {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    pub year: i32,
    pub shift: Shift,
    pub active: bool,
    /// Students with an active enrollment record.
    pub enrolled: BTreeSet<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A class section (turma) and its roster.
///
/// Invariant after every mutation: `0 < capacity` and `enrolled <= capacity`.
/// `version` is the optimistic-concurrency token of the stored row; the
/// repository rejects a save whose version no longer matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSection {
    id: String,
    name: String,
    capacity: u32,
    year: i32,
    shift: Shift,
    active: bool,
    enrolled: BTreeSet<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

fn to_capacity(section_id: &str, requested: i64, enrolled: u32) -> Result<u32, DomainError> {
    u32::try_from(requested)
        .ok()
        .filter(|c| *c > 0 && *c >= enrolled)
        .ok_or_else(|| DomainError::InvalidCapacity {
            section_id: section_id.to_string(),
            requested,
            enrolled,
        })
}

impl ClassSection {
    /// Create an empty, active section.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty id or name, `InvalidCapacity` if
    /// `capacity <= 0`.
    pub fn new(
        id: impl Into<String>,
        name: &str,
        capacity: i64,
        year: i32,
        shift: Shift,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::Validation("section id must not be empty".into()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("section name must not be empty".into()));
        }
        let capacity = to_capacity(&id, capacity, 0)?;
        Ok(Self {
            id,
            name: name.to_string(),
            capacity,
            year,
            shift,
            active: true,
            enrolled: BTreeSet::new(),
            version: 0,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        })
    }

    /// Rebuild from storage.
    ///
    /// # Errors
    ///
    /// `InvalidCapacity` if the stored roster exceeds the stored capacity.
    pub fn rehydrate(parts: ClassSectionParts) -> Result<Self, DomainError> {
        let section = Self {
            id: parts.id,
            name: parts.name,
            capacity: parts.capacity,
            year: parts.year,
            shift: parts.shift,
            active: parts.active,
            enrolled: parts.enrolled,
            version: parts.version,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            events: Vec::new(),
        };
        section.check_invariants()?;
        Ok(section)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn shift(&self) -> Shift {
        self.shift
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Current active enrollment.
    #[must_use]
    pub fn enrolled_count(&self) -> u32 {
        u32::try_from(self.enrolled.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn is_enrolled(&self, student_id: &str) -> bool {
        self.enrolled.contains(student_id)
    }

    #[must_use]
    pub const fn enrolled_students(&self) -> &BTreeSet<String> {
        &self.enrolled
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.enrolled_count() >= self.capacity
    }

    #[must_use]
    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn check_invariants(&self) -> Result<(), DomainError> {
        let enrolled = self.enrolled_count();
        if self.capacity == 0 || enrolled > self.capacity {
            return Err(DomainError::InvalidCapacity {
                section_id: self.id.clone(),
                requested: i64::from(self.capacity),
                enrolled,
            });
        }
        Ok(())
    }

    /// Enroll a student.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` when full; `InvalidOperation` when the section is
    /// inactive or the student is already enrolled.
    pub fn enroll(&mut self, student_id: &str, now: DateTime<Utc>) -> Result<(), DomainError> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(DomainError::Validation("student id must not be empty".into()));
        }
        if !self.active {
            return Err(DomainError::invalid_operation(
                ENTITY,
                &self.id,
                "section is inactive",
            ));
        }
        if self.is_enrolled(student_id) {
            return Err(DomainError::invalid_operation(
                ENTITY,
                &self.id,
                format!("student {student_id} is already enrolled"),
            ));
        }
        if self.is_full() {
            return Err(DomainError::CapacityExceeded {
                section_id: self.id.clone(),
                capacity: self.capacity,
            });
        }
        self.enrolled.insert(student_id.to_string());
        self.check_invariants()?;
        self.updated_at = now;
        self.events.push(DomainEvent::StudentEnrolled {
            section_id: self.id.clone(),
            student_id: student_id.to_string(),
            enrolled: self.enrolled_count(),
            at: now,
        });
        Ok(())
    }

    /// Remove a student's active enrollment.
    ///
    /// # Errors
    ///
    /// `NotEnrolled` if the student has no active enrollment here.
    pub fn unenroll(&mut self, student_id: &str, now: DateTime<Utc>) -> Result<(), DomainError> {
        let student_id = student_id.trim();
        if !self.enrolled.remove(student_id) {
            return Err(DomainError::NotEnrolled {
                section_id: self.id.clone(),
                student_id: student_id.to_string(),
            });
        }
        self.check_invariants()?;
        self.updated_at = now;
        self.events.push(DomainEvent::StudentUnenrolled {
            section_id: self.id.clone(),
            student_id: student_id.to_string(),
            enrolled: self.enrolled_count(),
            at: now,
        });
        Ok(())
    }

    /// Set a new capacity. Returns `false` when unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidCapacity` if `capacity <= 0` or below the current enrollment.
    pub fn change_capacity(&mut self, capacity: i64, now: DateTime<Utc>) -> Result<bool, DomainError> {
        let capacity = to_capacity(&self.id, capacity, self.enrolled_count())?;
        if capacity == self.capacity {
            return Ok(false);
        }
        let from = std::mem::replace(&mut self.capacity, capacity);
        self.check_invariants()?;
        self.updated_at = now;
        self.events.push(DomainEvent::CapacityChanged {
            section_id: self.id.clone(),
            from,
            to: capacity,
            at: now,
        });
        Ok(true)
    }

    /// Returns `false` if already active.
    pub fn activate(&mut self, now: DateTime<Utc>) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.updated_at = now;
        true
    }

    /// Inactive sections reject enrollment and new schedule entries.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.updated_at = now;
        true
    }

    /// Fact recorded when [`ClassSection::enroll`] refuses a full section.
    #[must_use]
    pub fn capacity_exceeded_attempt(&self, student_id: &str, now: DateTime<Utc>) -> DomainEvent {
        DomainEvent::CapacityExceededAttempt {
            section_id: self.id.clone(),
            student_id: student_id.trim().to_string(),
            capacity: self.capacity,
            at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::FactKind;
    use pretty_assertions::assert_eq;

    fn section(capacity: i64) -> ClassSection {
        ClassSection::new("sec-00000001", "7A", capacity, 2025, Shift::Morning, Utc::now()).unwrap()
    }

    #[test]
    fn new_rejects_non_positive_capacity() {
        for cap in [0, -3] {
            let err = ClassSection::new("sec-1", "7A", cap, 2025, Shift::Morning, Utc::now())
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidCapacity { .. }));
        }
    }

    #[test]
    fn thirty_first_enrollment_fails_and_count_stays() {
        let mut s = section(30);
        for i in 0..30 {
            s.enroll(&format!("stu-{i:02}"), Utc::now()).unwrap();
        }
        assert_eq!(s.enrolled_count(), 30);
        let err = s.enroll("stu-30", Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DomainError::CapacityExceeded {
                section_id: "sec-00000001".into(),
                capacity: 30
            }
        );
        assert_eq!(s.enrolled_count(), 30);
        assert!(!s.is_enrolled("stu-30"));
    }

    #[test]
    fn duplicate_enrollment_rejected() {
        let mut s = section(5);
        s.enroll("stu-1", Utc::now()).unwrap();
        assert!(matches!(
            s.enroll("stu-1", Utc::now()),
            Err(DomainError::InvalidOperation { .. })
        ));
        assert_eq!(s.enrolled_count(), 1);
    }

    #[test]
    fn inactive_section_rejects_enrollment() {
        let mut s = section(5);
        assert!(s.deactivate(Utc::now()));
        assert!(!s.deactivate(Utc::now()));
        assert!(matches!(
            s.enroll("stu-1", Utc::now()),
            Err(DomainError::InvalidOperation { .. })
        ));
        assert!(s.activate(Utc::now()));
        s.enroll("stu-1", Utc::now()).unwrap();
    }

    #[test]
    fn unenroll_requires_enrollment() {
        let mut s = section(5);
        assert!(matches!(
            s.unenroll("ghost", Utc::now()),
            Err(DomainError::NotEnrolled { .. })
        ));
        s.enroll("stu-1", Utc::now()).unwrap();
        s.unenroll("stu-1", Utc::now()).unwrap();
        assert_eq!(s.enrolled_count(), 0);
        let kinds: Vec<_> = s.take_events().iter().map(DomainEvent::kind).collect();
        assert_eq!(kinds, vec![FactKind::StudentEnrolled, FactKind::StudentUnenrolled]);
    }

    #[test]
    fn capacity_cannot_drop_below_enrollment() {
        let mut s = section(3);
        s.enroll("a", Utc::now()).unwrap();
        s.enroll("b", Utc::now()).unwrap();
        assert!(matches!(
            s.change_capacity(1, Utc::now()),
            Err(DomainError::InvalidCapacity { requested: 1, enrolled: 2, .. })
        ));
        assert!(matches!(
            s.change_capacity(0, Utc::now()),
            Err(DomainError::InvalidCapacity { .. })
        ));
        assert!(s.change_capacity(2, Utc::now()).unwrap());
        assert!(!s.change_capacity(2, Utc::now()).unwrap());
        assert_eq!(s.capacity(), 2);
        assert!(s.is_full());
    }

    #[test]
    fn rehydrate_enforces_roster_bound() {
        let now = Utc::now();
        let parts = ClassSectionParts {
            id: "sec-1".into(),
            name: "7A".into(),
            capacity: 1,
            year: 2025,
            shift: Shift::Afternoon,
            active: true,
            enrolled: ["a".to_string(), "b".to_string()].into_iter().collect(),
            version: 4,
            created_at: now,
            updated_at: now,
        };
        assert!(ClassSection::rehydrate(parts.clone()).is_err());
        let ok = ClassSection::rehydrate(ClassSectionParts {
            capacity: 2,
            ..parts
        })
        .unwrap();
        assert_eq!(ok.version(), 4);
        assert_eq!(ok.enrolled_count(), 2);
    }

    #[test]
    fn capacity_exceeded_attempt_fact() {
        let s = section(1);
        let ev = s.capacity_exceeded_attempt(" stu-9 ", Utc::now());
        assert_eq!(ev.kind(), FactKind::CapacityExceededAttempt);
        assert_eq!(ev.section_id(), "sec-00000001");
    }
}
