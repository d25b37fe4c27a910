//! Shared test utilities for schola-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use std::sync::Arc;

    use chrono::{NaiveTime, Utc};
    use schola_config::MEMORY_PATH;
    use schola_core::entities::{ClassSection, NewScheduleEntry, ScheduleEntry};
    use schola_core::enums::{Shift, Term, Weekday};
    use schola_core::period::AcademicPeriod;
    use schola_core::policy::SchedulingPolicy;
    use schola_core::time_slot::{TimeSlot, minute_to_time};

    use crate::ScholaDb;
    use crate::store::LibsqlStore;

    /// In-memory store with migrations applied.
    pub async fn test_store() -> LibsqlStore {
        let db = ScholaDb::open_local(MEMORY_PATH, 5000).await.unwrap();
        LibsqlStore::new(Arc::new(db))
    }

    /// Active full-day section for 2026.
    pub fn section(id: &str, capacity: i64) -> ClassSection {
        ClassSection::new(id, "7A", capacity, 2026, Shift::FullDay, Utc::now()).unwrap()
    }

    fn time(minute: u32) -> NaiveTime {
        minute_to_time(minute).unwrap()
    }

    /// Monday entry in 2026/T1.
    pub fn entry(
        id: &str,
        section_id: &str,
        teacher: &str,
        room: Option<&str>,
        start: u32,
        end: u32,
    ) -> ScheduleEntry {
        let draft = NewScheduleEntry {
            section_id: section_id.into(),
            subject_id: "sub-00000001".into(),
            teacher_id: teacher.into(),
            room: room.map(str::to_string),
            slot: TimeSlot::new(Weekday::Monday, time(start), time(end)).unwrap(),
            period: AcademicPeriod::of(2026, Term::First),
        };
        ScheduleEntry::create(id, draft, &SchedulingPolicy::default(), 2026, Utc::now()).unwrap()
    }
}
