//! Weekly time slot value object.
//!
//! A slot is a day of the week plus a `[start, end)` time of day at minute
//! precision. Two slots overlap only when they share a day and their
//! half-open intervals intersect, so back-to-back classes never conflict.

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::enums::Weekday;
use crate::errors::DomainError;
use crate::policy::SlotBounds;

/// Immutable day + start/end time. Equality is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SlotRepr", into = "SlotRepr")]
pub struct TimeSlot {
    day: Weekday,
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeSlot {
    /// Create a slot with the default 30..=240 minute bounds.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTimeSlot` when `start >= end`, the duration
    /// is outside the bounds, the day is Sunday, or a time has sub-minute parts.
    pub fn new(day: Weekday, start: NaiveTime, end: NaiveTime) -> Result<Self, DomainError> {
        Self::with_bounds(day, start, end, &SlotBounds::default())
    }

    /// Create a slot under explicit duration bounds.
    ///
    /// # Errors
    ///
    /// Same as [`TimeSlot::new`], using `bounds` for the duration check.
    pub fn with_bounds(
        day: Weekday,
        start: NaiveTime,
        end: NaiveTime,
        bounds: &SlotBounds,
    ) -> Result<Self, DomainError> {
        let slot = Self::structural(day, start, end)?;
        let minutes = slot.duration_minutes();
        if !bounds.contains(minutes) {
            return Err(DomainError::InvalidTimeSlot(format!(
                "duration {minutes} min is outside {}..={} min",
                bounds.min_minutes, bounds.max_minutes
            )));
        }
        Ok(slot)
    }

    /// Rebuild a slot from stored minutes-since-midnight.
    ///
    /// Only structural rules apply (day, ordering); duration bounds are policy
    /// and may have changed since the row was written.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTimeSlot` on structural violations.
    pub fn rehydrate(day: Weekday, start_minute: u32, end_minute: u32) -> Result<Self, DomainError> {
        Self::structural(day, minute_to_time(start_minute)?, minute_to_time(end_minute)?)
    }

    fn structural(day: Weekday, start: NaiveTime, end: NaiveTime) -> Result<Self, DomainError> {
        if day == Weekday::Sunday {
            return Err(DomainError::InvalidTimeSlot(
                "classes cannot be scheduled on Sunday".into(),
            ));
        }
        if start.second() != 0
            || start.nanosecond() != 0
            || end.second() != 0
            || end.nanosecond() != 0
        {
            return Err(DomainError::InvalidTimeSlot(
                "times must have minute precision".into(),
            ));
        }
        if start >= end {
            return Err(DomainError::InvalidTimeSlot(format!(
                "start {} must be before end {}",
                format_hhmm(start),
                format_hhmm(end)
            )));
        }
        Ok(Self { day, start, end })
    }

    #[must_use]
    pub const fn day(&self) -> Weekday {
        self.day
    }

    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    /// Start as minutes since midnight (storage form).
    #[must_use]
    pub fn start_minute(&self) -> u32 {
        self.start.num_seconds_from_midnight() / 60
    }

    /// End as minutes since midnight (storage form).
    #[must_use]
    pub fn end_minute(&self) -> u32 {
        self.end.num_seconds_from_midnight() / 60
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.end_minute() - self.start_minute()
    }

    /// Half-open overlap: same day and `start < other.end && end > other.start`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.day == other.day && self.start < other.end && self.end > other.start
    }

    /// Whether the slot lies entirely within `[window_start, window_end]`.
    #[must_use]
    pub fn fits_within(&self, window_start: NaiveTime, window_end: NaiveTime) -> bool {
        self.start >= window_start && self.end <= window_end
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.day.short(),
            format_hhmm(self.start),
            format_hhmm(self.end)
        )
    }
}

/// Wire form: `{"day": "monday", "start": "08:00", "end": "09:00"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SlotRepr {
    day: Weekday,
    start: String,
    end: String,
}

impl TryFrom<SlotRepr> for TimeSlot {
    type Error = DomainError;

    fn try_from(repr: SlotRepr) -> Result<Self, Self::Error> {
        Self::with_bounds(
            repr.day,
            parse_hhmm(&repr.start)?,
            parse_hhmm(&repr.end)?,
            &SlotBounds::default(),
        )
    }
}

impl From<TimeSlot> for SlotRepr {
    fn from(slot: TimeSlot) -> Self {
        Self {
            day: slot.day,
            start: format_hhmm(slot.start),
            end: format_hhmm(slot.end),
        }
    }
}

/// Parse `HH:MM` into a time of day.
///
/// # Errors
///
/// Returns `DomainError::InvalidTimeSlot` if the string is not a valid `HH:MM`.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| DomainError::InvalidTimeSlot(format!("invalid time '{s}': {e}")))
}

/// Format a time of day as `HH:MM`.
#[must_use]
pub fn format_hhmm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Convert minutes since midnight to a time of day.
///
/// # Errors
///
/// Returns `DomainError::InvalidTimeSlot` for values past 23:59.
pub fn minute_to_time(minute: u32) -> Result<NaiveTime, DomainError> {
    NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)
        .ok_or_else(|| DomainError::InvalidTimeSlot(format!("minute {minute} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn t(s: &str) -> NaiveTime {
        parse_hhmm(s).unwrap()
    }

    fn slot(day: Weekday, start: &str, end: &str) -> TimeSlot {
        TimeSlot::new(day, t(start), t(end)).unwrap()
    }

    #[rstest]
    #[case(Weekday::Monday, "09:00", "09:30")]
    #[case(Weekday::Saturday, "08:00", "12:00")]
    #[case(Weekday::Wednesday, "13:15", "14:45")]
    fn valid_slots_construct(#[case] day: Weekday, #[case] start: &str, #[case] end: &str) {
        let s = TimeSlot::new(day, t(start), t(end)).unwrap();
        assert!(s.start() < s.end());
        assert!((30..=240).contains(&s.duration_minutes()));
        assert_ne!(s.day(), Weekday::Sunday);
    }

    #[rstest]
    #[case::start_after_end(Weekday::Monday, "10:00", "09:00")]
    #[case::start_equals_end(Weekday::Monday, "10:00", "10:00")]
    #[case::too_short(Weekday::Monday, "10:00", "10:29")]
    #[case::too_long(Weekday::Monday, "08:00", "12:01")]
    #[case::sunday(Weekday::Sunday, "09:00", "10:00")]
    fn invalid_slots_rejected(#[case] day: Weekday, #[case] start: &str, #[case] end: &str) {
        let err = TimeSlot::new(day, t(start), t(end)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTimeSlot(_)), "{err:?}");
        assert!(err.is_validation());
    }

    #[test]
    fn sub_minute_times_rejected() {
        let start = NaiveTime::from_hms_opt(9, 0, 30).unwrap();
        let err = TimeSlot::new(Weekday::Monday, start, t("10:00")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTimeSlot(_)));
    }

    #[test]
    fn duration_bounds_are_inclusive() {
        assert!(TimeSlot::new(Weekday::Monday, t("08:00"), t("08:30")).is_ok());
        assert!(TimeSlot::new(Weekday::Monday, t("08:00"), t("12:00")).is_ok());
    }

    #[test]
    fn custom_bounds_apply() {
        let bounds = SlotBounds {
            min_minutes: 45,
            max_minutes: 90,
        };
        assert!(TimeSlot::with_bounds(Weekday::Monday, t("08:00"), t("08:30"), &bounds).is_err());
        assert!(TimeSlot::with_bounds(Weekday::Monday, t("08:00"), t("09:30"), &bounds).is_ok());
        assert!(TimeSlot::with_bounds(Weekday::Monday, t("08:00"), t("09:31"), &bounds).is_err());
    }

    #[test]
    fn touching_slots_do_not_overlap() {
        let a = slot(Weekday::Monday, "09:00", "10:00");
        let b = slot(Weekday::Monday, "10:00", "11:00");
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn same_times_on_different_days_do_not_overlap() {
        let a = slot(Weekday::Monday, "09:00", "10:00");
        let b = slot(Weekday::Tuesday, "09:00", "10:00");
        assert!(!a.overlaps(&b));
    }

    #[rstest]
    #[case("08:00", "09:00", "08:30", "09:30", true)]
    #[case("08:00", "12:00", "09:00", "10:00", true)]
    #[case("08:00", "09:00", "08:00", "09:00", true)]
    #[case("08:00", "09:00", "09:00", "10:00", false)]
    #[case("08:00", "09:00", "07:00", "08:00", false)]
    #[case("08:00", "09:00", "13:00", "14:00", false)]
    fn overlap_is_symmetric(
        #[case] a_start: &str,
        #[case] a_end: &str,
        #[case] b_start: &str,
        #[case] b_end: &str,
        #[case] expected: bool,
    ) {
        let a = slot(Weekday::Thursday, a_start, a_end);
        let b = slot(Weekday::Thursday, b_start, b_end);
        assert_eq!(a.overlaps(&b), expected);
        assert_eq!(b.overlaps(&a), expected);
    }

    #[test]
    fn display_uses_short_day() {
        assert_eq!(slot(Weekday::Monday, "08:00", "09:00").to_string(), "Mon 08:00-09:00");
    }

    #[test]
    fn rehydrate_skips_duration_policy() {
        let s = TimeSlot::rehydrate(Weekday::Friday, 8 * 60, 8 * 60 + 10).unwrap();
        assert_eq!(s.duration_minutes(), 10);
        assert!(TimeSlot::rehydrate(Weekday::Sunday, 480, 540).is_err());
        assert!(TimeSlot::rehydrate(Weekday::Friday, 540, 480).is_err());
        assert!(TimeSlot::rehydrate(Weekday::Friday, 480, 24 * 60).is_err());
    }

    #[test]
    fn serde_uses_hhmm_and_validates() {
        let s = slot(Weekday::Monday, "08:00", "09:00");
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"day": "monday", "start": "08:00", "end": "09:00"})
        );
        let back: TimeSlot = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);

        let bad = serde_json::json!({"day": "sunday", "start": "08:00", "end": "09:00"});
        assert!(serde_json::from_value::<TimeSlot>(bad).is_err());
    }

    #[test]
    fn serde_enforces_duration_bounds() {
        let too_short = serde_json::json!({"day": "monday", "start": "08:00", "end": "08:05"});
        let err = serde_json::from_value::<TimeSlot>(too_short).unwrap_err();
        assert!(err.to_string().contains("outside"), "{err}");

        let too_long = serde_json::json!({"day": "monday", "start": "08:00", "end": "13:00"});
        assert!(serde_json::from_value::<TimeSlot>(too_long).is_err());

        let longest = serde_json::json!({"day": "monday", "start": "08:00", "end": "12:00"});
        assert_eq!(
            serde_json::from_value::<TimeSlot>(longest).unwrap().duration_minutes(),
            240
        );
    }
}
