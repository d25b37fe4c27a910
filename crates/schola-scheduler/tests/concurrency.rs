//! Concurrent writers against one file database.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use schola_catalog::{CacheSettings, InMemoryCatalog, SubjectInfo, SubjectLookupCache};
use schola_core::enums::{Shift, Term, Weekday};
use schola_core::period::AcademicPeriod;
use schola_core::policy::SchedulingPolicy;
use schola_core::retry::RetryPolicy;
use schola_db::{EntryFilter, LibsqlStore, ScholaDb};
use schola_scheduler::{EnrollmentService, ScheduleRequest, SchedulingError, SchedulingService};

const YEAR: i32 = 2026;

fn retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 20,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(50),
    }
}

async fn services(dir: &tempfile::TempDir) -> (LibsqlStore, Arc<SchedulingService<LibsqlStore>>, Arc<EnrollmentService<LibsqlStore>>) {
    let path = dir.path().join("schola.db");
    let db = ScholaDb::open_local(path.to_str().unwrap(), 5000).await.unwrap();
    let store = LibsqlStore::new(Arc::new(db));

    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert(SubjectInfo {
        id: "sub-math".into(),
        school_id: "school-1".into(),
        name: "Mathematics".into(),
        active: true,
    });
    let cache = Arc::new(SubjectLookupCache::new(catalog, CacheSettings::default()));
    let policy = SchedulingPolicy::default();

    let scheduling = SchedulingService::new(store.clone(), cache, policy.clone())
        .with_current_year(YEAR)
        .with_retry(retry());
    let enrollment = EnrollmentService::new(store.clone(), policy)
        .with_current_year(YEAR)
        .with_retry(retry());
    (store, Arc::new(scheduling), Arc::new(enrollment))
}

fn request(section: &str, start: u32, end: u32) -> ScheduleRequest {
    ScheduleRequest {
        section_id: section.into(),
        subject_id: "sub-math".into(),
        teacher_id: "T1".into(),
        room: None,
        day: Weekday::Tuesday,
        start: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
        period: AcademicPeriod::of(YEAR, Term::Second),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_requests_for_one_teacher_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let (store, scheduling, enrollment) = services(&dir).await;

    let mut sections = Vec::new();
    for name in ["8A", "8B", "8C", "8D"] {
        let s = enrollment
            .create_section(name, 30, YEAR, Shift::FullDay)
            .await
            .unwrap();
        sections.push(s.id().to_string());
    }

    let handles: Vec<_> = sections
        .iter()
        .map(|section| {
            let svc = Arc::clone(&scheduling);
            let req = request(section, 10, 11);
            tokio::spawn(async move { svc.schedule(&req).await })
        })
        .collect();

    let mut admitted = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(SchedulingError::Conflict(report)) => {
                assert!(report.has_conflict());
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(conflicts, 3);

    let stored = store
        .list_entries(&EntryFilter {
            teacher_id: Some("T1".into()),
            active_only: true,
            ..EntryFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_enrollments_never_overfill() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, _scheduling, enrollment) = services(&dir).await;
    let section = enrollment
        .create_section("8A", 5, YEAR, Shift::FullDay)
        .await
        .unwrap()
        .id()
        .to_string();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let svc = Arc::clone(&enrollment);
            let section = section.clone();
            tokio::spawn(async move { svc.enroll(&section, &format!("stu-{i}")).await })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(SchedulingError::CapacityExceeded { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(admitted, 5);
    assert_eq!(enrollment.get_section(&section).await.unwrap().enrolled_count(), 5);
}
