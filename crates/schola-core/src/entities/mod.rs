//! Aggregates of the scheduling core.
//!
//! `ScheduleEntry` and `ClassSection` refer to each other only by id. Both
//! buffer domain events while mutating and are rebuilt from storage through
//! explicit `rehydrate` constructors.

mod class_section;
mod schedule_entry;

pub use class_section::{ClassSection, ClassSectionParts};
pub use schedule_entry::{NewScheduleEntry, ScheduleEntry, ScheduleEntryParts};
