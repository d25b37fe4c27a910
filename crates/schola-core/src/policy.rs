//! Scheduling policy: slot duration bounds, academic-year window, room length
//! and shift windows.
//!
//! These are business rules rather than structural invariants, so they are
//! carried as a value that the configuration layer can override. The defaults
//! are 30..=240 minute slots, a one-year window around the current year, rooms
//! of at most 50 characters, and the standard shift windows.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::enums::Shift;
use crate::errors::DomainError;
use crate::time_slot::{TimeSlot, format_hhmm};

pub const DEFAULT_MIN_SLOT_MINUTES: u32 = 30;
pub const DEFAULT_MAX_SLOT_MINUTES: u32 = 240;
pub const DEFAULT_YEAR_WINDOW: i32 = 1;
pub const DEFAULT_MAX_ROOM_LEN: usize = 50;

/// Inclusive duration bounds for a time slot, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBounds {
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl Default for SlotBounds {
    fn default() -> Self {
        Self {
            min_minutes: DEFAULT_MIN_SLOT_MINUTES,
            max_minutes: DEFAULT_MAX_SLOT_MINUTES,
        }
    }
}

impl SlotBounds {
    #[must_use]
    pub const fn contains(&self, minutes: u32) -> bool {
        minutes >= self.min_minutes && minutes <= self.max_minutes
    }
}

/// A `[start, end)` time-of-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ShiftWindow {
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `start >= end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, DomainError> {
        if start >= end {
            return Err(DomainError::Validation(format!(
                "shift window start {} must precede end {}",
                format_hhmm(start),
                format_hhmm(end)
            )));
        }
        Ok(Self { start, end })
    }

    fn hm(start: (u32, u32), end: (u32, u32)) -> Self {
        let at = |(h, m): (u32, u32)| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
        Self {
            start: at(start),
            end: at(end),
        }
    }
}

/// Allowed time-of-day window per shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindows {
    pub morning: ShiftWindow,
    pub afternoon: ShiftWindow,
    pub evening: ShiftWindow,
    pub full_day: ShiftWindow,
}

impl Default for ShiftWindows {
    fn default() -> Self {
        Self {
            morning: ShiftWindow::hm((7, 0), (12, 30)),
            afternoon: ShiftWindow::hm((12, 30), (18, 30)),
            evening: ShiftWindow::hm((18, 30), (22, 30)),
            full_day: ShiftWindow::hm((7, 0), (18, 30)),
        }
    }
}

impl ShiftWindows {
    #[must_use]
    pub const fn window(&self, shift: Shift) -> ShiftWindow {
        match shift {
            Shift::Morning => self.morning,
            Shift::Afternoon => self.afternoon,
            Shift::Evening => self.evening,
            Shift::FullDay => self.full_day,
        }
    }
}

/// The complete set of configurable scheduling rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingPolicy {
    pub slot: SlotBounds,
    /// Years accepted on either side of the current year.
    pub year_window: i32,
    pub max_room_len: usize,
    pub shifts: ShiftWindows,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            slot: SlotBounds::default(),
            year_window: DEFAULT_YEAR_WINDOW,
            max_room_len: DEFAULT_MAX_ROOM_LEN,
            shifts: ShiftWindows::default(),
        }
    }
}

impl SchedulingPolicy {
    /// Check an academic year against the window around `current_year`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the year is outside the window.
    pub fn check_year(&self, year: i32, current_year: i32) -> Result<(), DomainError> {
        let low = current_year - self.year_window;
        let high = current_year + self.year_window;
        if year < low || year > high {
            return Err(DomainError::Validation(format!(
                "academic year {year} is outside {low}..={high}"
            )));
        }
        Ok(())
    }

    /// Normalize an optional room: trims it, maps blank to `None`, bounds the length.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the trimmed room is too long.
    pub fn normalize_room(&self, room: Option<&str>) -> Result<Option<String>, DomainError> {
        let Some(room) = room.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        if room.chars().count() > self.max_room_len {
            return Err(DomainError::Validation(format!(
                "room '{room}' exceeds {} characters",
                self.max_room_len
            )));
        }
        Ok(Some(room.to_string()))
    }

    /// Check that a slot lies inside the window of the given shift.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the slot starts before or ends after
    /// the shift window.
    pub fn check_shift(&self, shift: Shift, slot: &TimeSlot) -> Result<(), DomainError> {
        let window = self.shifts.window(shift);
        if !slot.fits_within(window.start, window.end) {
            return Err(DomainError::Validation(format!(
                "slot {slot} is outside the {shift} shift ({}-{})",
                format_hhmm(window.start),
                format_hhmm(window.end)
            )));
        }
        Ok(())
    }

    /// Validate the policy itself.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for empty or inverted bounds.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.slot.min_minutes == 0 || self.slot.min_minutes > self.slot.max_minutes {
            return Err(DomainError::Validation(format!(
                "slot bounds {}..={} are invalid",
                self.slot.min_minutes, self.slot.max_minutes
            )));
        }
        if self.year_window < 0 {
            return Err(DomainError::Validation("year window must be >= 0".into()));
        }
        if self.max_room_len == 0 {
            return Err(DomainError::Validation("max room length must be > 0".into()));
        }
        Ok(())
    }
}
