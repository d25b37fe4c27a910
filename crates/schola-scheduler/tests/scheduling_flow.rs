//! End-to-end scheduling and enrollment against an in-memory libSQL store.

use std::sync::Arc;

use chrono::NaiveTime;
use pretty_assertions::assert_eq;
use schola_catalog::{CacheSettings, CatalogNotifier, InMemoryCatalog, SubjectInfo, SubjectLookupCache};
use schola_config::MEMORY_PATH;
use schola_core::enums::{ConflictKind, EntryStatus, FactKind, Shift, Term, Weekday};
use schola_core::period::AcademicPeriod;
use schola_core::policy::SchedulingPolicy;
use schola_core::retry::RetryPolicy;
use schola_db::{FactFilter, JsonlFactSink, LibsqlStore, ScholaDb};
use schola_scheduler::{
    EnrollmentService, FactRelay, ScheduleRequest, SchedulingError, SchedulingService,
};

const YEAR: i32 = 2026;

struct Harness {
    store: LibsqlStore,
    catalog: Arc<InMemoryCatalog>,
    scheduling: SchedulingService<LibsqlStore>,
    enrollment: EnrollmentService<LibsqlStore>,
}

async fn harness() -> Harness {
    let db = ScholaDb::open_local(MEMORY_PATH, 5000).await.unwrap();
    let store = LibsqlStore::new(Arc::new(db));
    let notifier = CatalogNotifier::new();
    let catalog = Arc::new(InMemoryCatalog::with_notifier(notifier.clone()));
    for (id, name) in [("sub-math", "Mathematics"), ("sub-art", "Art")] {
        catalog.insert(SubjectInfo {
            id: id.into(),
            school_id: "school-1".into(),
            name: name.into(),
            active: true,
        });
    }
    let cache = Arc::new(SubjectLookupCache::new(catalog.clone(), CacheSettings::default()));
    notifier.subscribe(&cache);

    let policy = SchedulingPolicy::default();
    Harness {
        scheduling: SchedulingService::new(store.clone(), cache, policy.clone())
            .with_current_year(YEAR)
            .with_retry(RetryPolicy::none()),
        enrollment: EnrollmentService::new(store.clone(), policy).with_current_year(YEAR),
        store,
        catalog,
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn request(section: &str, teacher: &str, room: Option<&str>, start: NaiveTime, end: NaiveTime) -> ScheduleRequest {
    ScheduleRequest {
        section_id: section.into(),
        subject_id: "sub-math".into(),
        teacher_id: teacher.into(),
        room: room.map(str::to_string),
        day: Weekday::Monday,
        start,
        end,
        period: AcademicPeriod::of(YEAR, Term::First),
    }
}

async fn section(h: &Harness, capacity: i64) -> String {
    h.enrollment
        .create_section("7A", capacity, YEAR, Shift::FullDay)
        .await
        .unwrap()
        .id()
        .to_string()
}

#[tokio::test]
async fn teacher_double_booking_across_rooms() {
    let h = harness().await;
    let a = section(&h, 30).await;
    let b = section(&h, 30).await;

    let first = h
        .scheduling
        .schedule(&request(&a, "T1", Some("101"), hm(8, 0), hm(9, 0)))
        .await
        .unwrap();
    let err = h
        .scheduling
        .schedule(&request(&b, "T1", Some("102"), hm(8, 30), hm(9, 30)))
        .await
        .unwrap_err();

    let report = err.conflict().expect("conflict");
    assert_eq!(report.kinds(), vec![ConflictKind::Teacher]);
    assert_eq!(report.teacher[0].entry_id, first.id());

    // Touching slot is fine.
    h.scheduling
        .schedule(&request(&b, "T1", Some("102"), hm(9, 0), hm(10, 0)))
        .await
        .unwrap();
}

#[tokio::test]
async fn cancel_frees_the_slot_and_reactivate_rechecks() {
    let h = harness().await;
    let a = section(&h, 30).await;
    let b = section(&h, 30).await;

    let first = h
        .scheduling
        .schedule(&request(&a, "T1", Some("101"), hm(8, 0), hm(9, 0)))
        .await
        .unwrap();
    let cancelled = h.scheduling.cancel(first.id()).await.unwrap();
    assert_eq!(cancelled.status(), EntryStatus::Cancelled);
    // Idempotent.
    h.scheduling.cancel(first.id()).await.unwrap();

    h.scheduling
        .schedule(&request(&b, "T1", Some("102"), hm(8, 30), hm(9, 30)))
        .await
        .unwrap();

    let err = h.scheduling.reactivate(first.id()).await.unwrap_err();
    assert!(matches!(err, SchedulingError::Conflict(_)));
    let stored = h.scheduling.get_entry(first.id()).await.unwrap();
    assert_eq!(stored.status(), EntryStatus::Cancelled);
}

#[tokio::test]
async fn reschedule_checks_conflicts_excluding_itself() {
    let h = harness().await;
    let a = section(&h, 30).await;
    let b = section(&h, 30).await;

    let e1 = h
        .scheduling
        .schedule(&request(&a, "T1", Some("101"), hm(8, 0), hm(9, 0)))
        .await
        .unwrap();
    let e2 = h
        .scheduling
        .schedule(&request(&b, "T2", Some("102"), hm(8, 0), hm(9, 0)))
        .await
        .unwrap();

    // Shifting within its own slot only overlaps itself.
    let moved = h
        .scheduling
        .change_slot(e1.id(), Weekday::Monday, hm(8, 30), hm(9, 30))
        .await
        .unwrap();
    assert_eq!(moved.slot().start(), hm(8, 30));

    let err = h.scheduling.change_room(e1.id(), Some("102")).await.unwrap_err();
    assert_eq!(err.conflict().unwrap().kinds(), vec![ConflictKind::Room]);
    let err = h.scheduling.change_teacher(e2.id(), "T1").await.unwrap_err();
    assert_eq!(err.conflict().unwrap().kinds(), vec![ConflictKind::Teacher]);

    let roomless = h.scheduling.change_room(e1.id(), Some("   ")).await.unwrap();
    assert_eq!(roomless.room(), None);
}

#[tokio::test]
async fn cancelled_entries_reject_edits() {
    let h = harness().await;
    let a = section(&h, 30).await;
    let e = h
        .scheduling
        .schedule(&request(&a, "T1", None, hm(8, 0), hm(9, 0)))
        .await
        .unwrap();
    h.scheduling.cancel(e.id()).await.unwrap();
    let err = h.scheduling.change_teacher(e.id(), "T2").await.unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidOperation { .. }));
    h.scheduling.reactivate(e.id()).await.unwrap();
    let err = h.scheduling.reactivate(e.id()).await.unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidOperation { .. }));
}

#[tokio::test]
async fn input_validation() {
    let h = harness().await;
    let a = section(&h, 30).await;

    let too_short = h
        .scheduling
        .schedule(&request(&a, "T1", None, hm(8, 0), hm(8, 15)))
        .await
        .unwrap_err();
    assert!(matches!(too_short, SchedulingError::Validation(_)));

    let mut sunday = request(&a, "T1", None, hm(8, 0), hm(9, 0));
    sunday.day = Weekday::Sunday;
    assert!(matches!(
        h.scheduling.schedule(&sunday).await.unwrap_err(),
        SchedulingError::Validation(_)
    ));

    let mut far = request(&a, "T1", None, hm(8, 0), hm(9, 0));
    far.period = AcademicPeriod::of(YEAR + 2, Term::First);
    assert!(matches!(
        h.scheduling.schedule(&far).await.unwrap_err(),
        SchedulingError::Validation(_)
    ));

    let missing_section = h
        .scheduling
        .schedule(&request("sec-ffffffff", "T1", None, hm(8, 0), hm(9, 0)))
        .await
        .unwrap_err();
    assert!(matches!(missing_section, SchedulingError::NotFound { .. }));
}

#[tokio::test]
async fn shift_window_is_enforced() {
    let h = harness().await;
    let morning = h
        .enrollment
        .create_section("9C", 25, YEAR, Shift::Morning)
        .await
        .unwrap();
    let err = h
        .scheduling
        .schedule(&request(morning.id(), "T1", None, hm(13, 0), hm(14, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Validation(_)));
}

#[tokio::test]
async fn subject_checks_fail_closed() {
    let h = harness().await;
    let a = section(&h, 30).await;

    let mut unknown = request(&a, "T1", None, hm(8, 0), hm(9, 0));
    unknown.subject_id = "sub-none".into();
    assert!(matches!(
        h.scheduling.schedule(&unknown).await.unwrap_err(),
        SchedulingError::NotFound { .. }
    ));

    h.catalog.set_failing(true);
    let mut art = request(&a, "T1", None, hm(8, 0), hm(9, 0));
    art.subject_id = "sub-art".into();
    let err = h.scheduling.schedule(&art).await.unwrap_err();
    assert!(matches!(err, SchedulingError::SubjectUnavailable { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn deactivation_is_visible_before_ttl() {
    let h = harness().await;
    let a = section(&h, 30).await;
    h.scheduling
        .schedule(&request(&a, "T1", None, hm(8, 0), hm(9, 0)))
        .await
        .unwrap();

    assert!(h.catalog.set_active("sub-math", false));
    let err = h
        .scheduling
        .schedule(&request(&a, "T1", None, hm(10, 0), hm(11, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Validation(_)));
}

#[tokio::test]
async fn inactive_section_rejects_scheduling_and_enrollment() {
    let h = harness().await;
    let a = section(&h, 30).await;
    h.enrollment.deactivate(&a).await.unwrap();

    let err = h
        .scheduling
        .schedule(&request(&a, "T1", None, hm(8, 0), hm(9, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidOperation { .. }));
    let err = h.enrollment.enroll(&a, "stu-1").await.unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidOperation { .. }));

    h.enrollment.activate(&a).await.unwrap();
    h.enrollment.enroll(&a, "stu-1").await.unwrap();
}

#[tokio::test]
async fn thirty_first_enrollment_fails() {
    let h = harness().await;
    let a = section(&h, 30).await;
    for i in 0..30 {
        h.enrollment.enroll(&a, &format!("stu-{i:02}")).await.unwrap();
    }
    let err = h.enrollment.enroll(&a, "stu-30").await.unwrap_err();
    assert_eq!(err, SchedulingError::CapacityExceeded { section_id: a.clone() });

    let section = h.enrollment.get_section(&a).await.unwrap();
    assert_eq!(section.enrolled_count(), 30);
    assert_eq!(section.version(), 30);

    let attempts = h
        .store
        .query_facts(&FactFilter {
            kind: Some(FactKind::CapacityExceededAttempt),
            ..FactFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
}

#[tokio::test]
async fn roster_changes() {
    let h = harness().await;
    let a = section(&h, 2).await;
    h.enrollment.enroll(&a, "stu-1").await.unwrap();
    h.enrollment.enroll(&a, "stu-2").await.unwrap();

    let err = h.enrollment.enroll(&a, "stu-1").await.unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidOperation { .. }));
    let err = h.enrollment.change_capacity(&a, 1).await.unwrap_err();
    assert!(matches!(err, SchedulingError::Validation(_)));
    let err = h.enrollment.unenroll(&a, "stu-9").await.unwrap_err();
    assert!(
        matches!(&err, SchedulingError::NotEnrolled { student_id, .. } if student_id == "stu-9"),
        "{err}"
    );

    h.enrollment.unenroll(&a, "stu-2").await.unwrap();
    let s = h.enrollment.change_capacity(&a, 1).await.unwrap();
    assert_eq!(s.capacity(), 1);
    assert_eq!(s.enrolled_count(), 1);
}

#[tokio::test]
async fn facts_flow_through_relay_to_jsonl() {
    let h = harness().await;
    let a = section(&h, 30).await;
    let e = h
        .scheduling
        .schedule(&request(&a, "T1", Some("101"), hm(8, 0), hm(9, 0)))
        .await
        .unwrap();
    h.scheduling.change_teacher(e.id(), "T2").await.unwrap();

    // A rejected request leaves nothing in the outbox.
    let rejected = h
        .scheduling
        .schedule(&request(&a, "T2", Some("103"), hm(8, 0), hm(9, 0)))
        .await;
    assert!(matches!(rejected, Err(SchedulingError::Conflict(_))));

    h.scheduling.cancel(e.id()).await.unwrap();
    h.enrollment.enroll(&a, "stu-1").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(JsonlFactSink::new(dir.path()).unwrap());
    let mut relay = FactRelay::new(h.store.clone(), 2);
    relay.subscribe(sink);
    let report = relay.drain().await.unwrap();
    assert_eq!(report.delivered, 4);
    assert!(report.failure.is_none());

    let kinds: Vec<FactKind> = h
        .store
        .query_facts(&FactFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            FactKind::ScheduleCreated,
            FactKind::TeacherChanged,
            FactKind::ScheduleCancelled,
            FactKind::StudentEnrolled,
        ]
    );

    let mut lines = 0;
    for file in std::fs::read_dir(dir.path()).unwrap() {
        lines += JsonlFactSink::read_file(&file.unwrap().path()).unwrap().len();
    }
    assert_eq!(lines, 4);
    assert_eq!(relay.drain().await.unwrap().delivered, 0);
}
