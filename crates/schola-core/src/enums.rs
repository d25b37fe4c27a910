//! Day, term, status, shift and fact enums for Schola.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and expose `as_str()` for SQL storage. Status enums with a state machine
//! provide `allowed_next_states()` to enforce valid transitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DomainError;

// ---------------------------------------------------------------------------
// Weekday
// ---------------------------------------------------------------------------

/// Day of the week. Sunday exists so it can be named and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Days on which classes may be scheduled.
    pub const SCHOOL_DAYS: [Self; 6] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }

    /// Three-letter label used in slot display (`Mon 08:00-09:00`).
    #[must_use]
    pub const fn short(self) -> &'static str {
        match self {
            Self::Monday => "Mon",
            Self::Tuesday => "Tue",
            Self::Wednesday => "Wed",
            Self::Thursday => "Thu",
            Self::Friday => "Fri",
            Self::Saturday => "Sat",
            Self::Sunday => "Sun",
        }
    }

    /// ISO day number, Monday = 1 .. Sunday = 7. Used as the storage value.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
            Self::Sunday => 7,
        }
    }

    /// Inverse of [`Weekday::number`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for numbers outside 1..=7.
    pub fn from_number(n: i64) -> Result<Self, DomainError> {
        match n {
            1 => Ok(Self::Monday),
            2 => Ok(Self::Tuesday),
            3 => Ok(Self::Wednesday),
            4 => Ok(Self::Thursday),
            5 => Ok(Self::Friday),
            6 => Ok(Self::Saturday),
            7 => Ok(Self::Sunday),
            other => Err(DomainError::Validation(format!(
                "day number must be 1..=7, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let day = match lower.as_str() {
            "mon" | "monday" => Self::Monday,
            "tue" | "tues" | "tuesday" => Self::Tuesday,
            "wed" | "wednesday" => Self::Wednesday,
            "thu" | "thur" | "thurs" | "thursday" => Self::Thursday,
            "fri" | "friday" => Self::Friday,
            "sat" | "saturday" => Self::Saturday,
            "sun" | "sunday" => Self::Sunday,
            _ => {
                return Err(DomainError::Validation(format!("unknown day '{s}'")));
            }
        };
        Ok(day)
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

// ---------------------------------------------------------------------------
// Term
// ---------------------------------------------------------------------------

/// Academic term within a year. Only two terms exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    First,
    Second,
}

impl Term {
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless `n` is 1 or 2.
    pub fn from_number(n: i64) -> Result<Self, DomainError> {
        match n {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            other => Err(DomainError::Validation(format!(
                "term must be 1 or 2, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

// ---------------------------------------------------------------------------
// EntryStatus
// ---------------------------------------------------------------------------

/// Status of a schedule entry.
///
/// ```text
/// active → cancelled → active (reactivated)
/// ```
///
/// Rescheduling keeps an entry `active`; it is not a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Active,
    Cancelled,
}

impl EntryStatus {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Active => &[Self::Cancelled],
            Self::Cancelled => &[Self::Active],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Shift
// ---------------------------------------------------------------------------

/// Shift (turno) of a class section. Each shift maps to a time-of-day window
/// defined by the scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Afternoon,
    Evening,
    FullDay,
}

impl Shift {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::FullDay => "full_day",
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shift {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            "full_day" | "fullday" => Ok(Self::FullDay),
            _ => Err(DomainError::Validation(format!("unknown shift '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ConflictKind
// ---------------------------------------------------------------------------

/// The resource that a conflicting booking double-books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Teacher,
    Room,
    Section,
}

impl ConflictKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Room => "room",
            Self::Section => "section",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(Self::Teacher),
            "room" => Ok(Self::Room),
            "section" => Ok(Self::Section),
            _ => Err(DomainError::Validation(format!("unknown conflict kind '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// FactKind
// ---------------------------------------------------------------------------

/// Kind of a domain fact published to other modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    ScheduleCreated,
    ScheduleCancelled,
    ScheduleReactivated,
    TeacherChanged,
    RoomChanged,
    SlotChanged,
    StudentEnrolled,
    StudentUnenrolled,
    CapacityChanged,
    CapacityExceededAttempt,
}

impl FactKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ScheduleCreated => "schedule_created",
            Self::ScheduleCancelled => "schedule_cancelled",
            Self::ScheduleReactivated => "schedule_reactivated",
            Self::TeacherChanged => "teacher_changed",
            Self::RoomChanged => "room_changed",
            Self::SlotChanged => "slot_changed",
            Self::StudentEnrolled => "student_enrolled",
            Self::StudentUnenrolled => "student_unenrolled",
            Self::CapacityChanged => "capacity_changed",
            Self::CapacityExceededAttempt => "capacity_exceeded_attempt",
        }
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("mon", Weekday::Monday)]
    #[case("Tuesday", Weekday::Tuesday)]
    #[case(" wed ", Weekday::Wednesday)]
    #[case("THU", Weekday::Thursday)]
    #[case("fri", Weekday::Friday)]
    #[case("saturday", Weekday::Saturday)]
    #[case("sun", Weekday::Sunday)]
    fn weekday_parses_short_and_long_names(#[case] input: &str, #[case] expected: Weekday) {
        assert_eq!(input.parse::<Weekday>().unwrap(), expected);
    }

    #[test]
    fn weekday_number_roundtrip() {
        for day in Weekday::SCHOOL_DAYS.into_iter().chain([Weekday::Sunday]) {
            assert_eq!(Weekday::from_number(i64::from(day.number())).unwrap(), day);
        }
        assert!(Weekday::from_number(0).is_err());
        assert!(Weekday::from_number(8).is_err());
    }

    #[test]
    fn school_days_exclude_sunday() {
        assert!(!Weekday::SCHOOL_DAYS.contains(&Weekday::Sunday));
    }

    #[test]
    fn term_accepts_only_one_and_two() {
        assert_eq!(Term::from_number(1).unwrap(), Term::First);
        assert_eq!(Term::from_number(2).unwrap(), Term::Second);
        assert!(Term::from_number(0).is_err());
        assert!(Term::from_number(3).is_err());
    }

    #[test]
    fn entry_status_transitions() {
        assert!(EntryStatus::Active.can_transition_to(EntryStatus::Cancelled));
        assert!(EntryStatus::Cancelled.can_transition_to(EntryStatus::Active));
        assert!(!EntryStatus::Active.can_transition_to(EntryStatus::Active));
        assert!(!EntryStatus::Cancelled.can_transition_to(EntryStatus::Cancelled));
    }

    #[test]
    fn shift_parses_aliases() {
        assert_eq!("Evening".parse::<Shift>().unwrap(), Shift::Evening);
        assert!("night".parse::<Shift>().is_err());
        assert_eq!("full-day".parse::<Shift>().unwrap(), Shift::FullDay);
        assert!("weekend".parse::<Shift>().is_err());
    }

    #[test]
    fn as_str_matches_serde() {
        for kind in [
            FactKind::ScheduleCreated,
            FactKind::TeacherChanged,
            FactKind::CapacityExceededAttempt,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json.as_str().unwrap(), kind.as_str());
        }
        let json = serde_json::to_value(Shift::FullDay).unwrap();
        assert_eq!(json.as_str().unwrap(), Shift::FullDay.as_str());
    }
}
