//! Scheduling policy configuration.
//!
//! Shift windows are written as `"HH:MM-HH:MM"` strings and parsed into
//! [`SchedulingPolicy`] by [`PolicyConfig::to_policy`].

use serde::{Deserialize, Serialize};

use schola_core::policy::{
    DEFAULT_MAX_ROOM_LEN, DEFAULT_MAX_SLOT_MINUTES, DEFAULT_MIN_SLOT_MINUTES, DEFAULT_YEAR_WINDOW,
    SchedulingPolicy, ShiftWindow, ShiftWindows, SlotBounds,
};
use schola_core::time_slot::parse_hhmm;

use crate::ConfigError;

const fn default_min_slot() -> u32 {
    DEFAULT_MIN_SLOT_MINUTES
}

const fn default_max_slot() -> u32 {
    DEFAULT_MAX_SLOT_MINUTES
}

const fn default_year_window() -> i32 {
    DEFAULT_YEAR_WINDOW
}

const fn default_max_room_len() -> usize {
    DEFAULT_MAX_ROOM_LEN
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ShiftConfig {
    pub morning: String,
    pub afternoon: String,
    pub evening: String,
    pub full_day: String,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            morning: "07:00-12:30".into(),
            afternoon: "12:30-18:30".into(),
            evening: "18:30-22:30".into(),
            full_day: "07:00-18:30".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    #[serde(default = "default_min_slot")]
    pub min_slot_minutes: u32,

    #[serde(default = "default_max_slot")]
    pub max_slot_minutes: u32,

    /// Academic years accepted on either side of the current year.
    #[serde(default = "default_year_window")]
    pub year_window: i32,

    #[serde(default = "default_max_room_len")]
    pub max_room_len: usize,

    #[serde(default)]
    pub shifts: ShiftConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_slot_minutes: default_min_slot(),
            max_slot_minutes: default_max_slot(),
            year_window: default_year_window(),
            max_room_len: default_max_room_len(),
            shifts: ShiftConfig::default(),
        }
    }
}

fn parse_window(field: &str, raw: &str) -> Result<ShiftWindow, ConfigError> {
    let (start, end) = raw
        .split_once('-')
        .ok_or_else(|| ConfigError::invalid(field, format!("expected HH:MM-HH:MM, got '{raw}'")))?;
    let start = parse_hhmm(start).map_err(|e| ConfigError::invalid(field, e.to_string()))?;
    let end = parse_hhmm(end).map_err(|e| ConfigError::invalid(field, e.to_string()))?;
    ShiftWindow::new(start, end).map_err(|e| ConfigError::invalid(field, e.to_string()))
}

impl PolicyConfig {
    /// Build the domain policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for malformed shift windows or
    /// inconsistent bounds.
    pub fn to_policy(&self) -> Result<SchedulingPolicy, ConfigError> {
        let policy = SchedulingPolicy {
            slot: SlotBounds {
                min_minutes: self.min_slot_minutes,
                max_minutes: self.max_slot_minutes,
            },
            year_window: self.year_window,
            max_room_len: self.max_room_len,
            shifts: ShiftWindows {
                morning: parse_window("policy.shifts.morning", &self.shifts.morning)?,
                afternoon: parse_window("policy.shifts.afternoon", &self.shifts.afternoon)?,
                evening: parse_window("policy.shifts.evening", &self.shifts.evening)?,
                full_day: parse_window("policy.shifts.full_day", &self.shifts.full_day)?,
            },
        };
        policy
            .validate()
            .map_err(|e| ConfigError::invalid("policy", e.to_string()))?;
        Ok(policy)
    }
}
