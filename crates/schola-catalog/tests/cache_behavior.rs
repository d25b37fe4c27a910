//! Timing and invalidation behaviour of the subject lookup cache.
//!
//! Uses paused tokio time so TTLs and timeouts are deterministic.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use schola_catalog::{
    CacheSettings, CatalogError, CatalogNotifier, InMemoryCatalog, SubjectCacheInvalidation,
    SubjectInfo, SubjectLookupCache,
};

fn physics(active: bool) -> SubjectInfo {
    SubjectInfo {
        id: "sub-phys".into(),
        school_id: "school-1".into(),
        name: "Physics".into(),
        active,
    }
}

/// A catalog wired to a cache the way the application wires them.
fn wired() -> (Arc<InMemoryCatalog>, Arc<SubjectLookupCache>) {
    let notifier = CatalogNotifier::new();
    let catalog = Arc::new(InMemoryCatalog::with_notifier(notifier.clone()));
    let cache = Arc::new(SubjectLookupCache::new(
        catalog.clone(),
        CacheSettings::default(),
    ));
    notifier.subscribe(&cache);
    (catalog, cache)
}

#[tokio::test(start_paused = true)]
async fn without_invalidation_deactivation_waits_for_ttl() {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert(physics(true));
    let cache = SubjectLookupCache::new(catalog.clone(), CacheSettings::default());

    assert!(cache.lookup("sub-phys").await.unwrap().active);
    catalog.set_active("sub-phys", false);

    tokio::time::advance(Duration::from_secs(299)).await;
    assert!(cache.lookup("sub-phys").await.unwrap().active, "still cached");

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(!cache.lookup("sub-phys").await.unwrap().active, "expired");
    assert_eq!(catalog.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn invalidation_makes_deactivation_visible_before_ttl() {
    let (catalog, cache) = wired();
    catalog.insert(physics(true));

    assert!(cache.lookup("sub-phys").await.unwrap().is_usable());
    catalog.set_active("sub-phys", false);

    let after = cache.lookup("sub-phys").await.unwrap();
    assert!(after.exists);
    assert!(!after.is_usable());
}

#[tokio::test(start_paused = true)]
async fn listing_ttl_is_shorter_than_subject_ttl() {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert(physics(true));
    let cache = SubjectLookupCache::new(catalog.clone(), CacheSettings::default());

    cache.lookup("sub-phys").await.unwrap();
    cache.active_subjects("school-1").await.unwrap();
    assert_eq!(catalog.calls(), 2);

    tokio::time::advance(Duration::from_secs(61)).await;
    cache.lookup("sub-phys").await.unwrap();
    assert_eq!(catalog.calls(), 2, "subject still fresh");
    cache.active_subjects("school-1").await.unwrap();
    assert_eq!(catalog.calls(), 3, "listing refetched");
}

#[tokio::test(start_paused = true)]
async fn slow_catalog_times_out_and_fails_closed() {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert(physics(true));
    catalog.set_delay(Some(Duration::from_secs(5)));
    let cache = SubjectLookupCache::new(catalog.clone(), CacheSettings::default());

    let err = cache.lookup("sub-phys").await.unwrap_err();
    assert_eq!(err, CatalogError::Timeout(Duration::from_secs(2)));

    catalog.set_delay(None);
    assert!(cache.lookup("sub-phys").await.unwrap().is_usable());
    assert_eq!(catalog.calls(), 2, "timeouts are never cached");
}

#[tokio::test]
async fn catalog_failure_is_not_cached() {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert(physics(true));
    catalog.set_failing(true);
    let cache = SubjectLookupCache::new(catalog.clone(), CacheSettings::default());

    assert!(matches!(
        cache.lookup("sub-phys").await,
        Err(CatalogError::Unavailable(_))
    ));
    catalog.set_failing(false);
    assert!(cache.lookup("sub-phys").await.unwrap().is_usable());
}

#[tokio::test(start_paused = true)]
async fn invalidation_during_lookup_discards_in_flight_result() {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert(physics(true));
    catalog.set_delay(Some(Duration::from_millis(100)));
    let cache = Arc::new(SubjectLookupCache::new(
        catalog.clone(),
        CacheSettings::default(),
    ));

    let in_flight = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.lookup("sub-phys").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.invalidate_subject("sub-phys");

    assert!(in_flight.await.unwrap().unwrap().exists);
    assert_eq!(cache.stats().discarded, 1);

    cache.lookup("sub-phys").await.unwrap();
    assert_eq!(catalog.calls(), 2, "discarded result was not stored");
}
