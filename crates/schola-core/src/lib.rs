//! # schola-core
//!
//! Domain types for Schola timetable scheduling.
//!
//! - `TimeSlot` value object with half-open overlap
//! - `ScheduleEntry` and `ClassSection` aggregates with explicit rehydration
//! - Configurable `SchedulingPolicy` (slot bounds, year window, shift windows)
//! - Pure conflict scan producing a `ConflictReport`
//! - Domain facts and the outbox record shape
//! - Repository, unit-of-work and fact ports
//! - ID prefix constants

pub mod conflict;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod facts;
pub mod ids;
pub mod period;
pub mod policy;
pub mod ports;
pub mod retry;
pub mod time_slot;
