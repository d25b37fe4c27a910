//! Read-through subject cache.
//!
//! Positive lookups are kept for `subject_ttl`; "not found" is never cached so
//! a subject created a moment ago is visible at once. Per-school listings of
//! active subjects are kept for the shorter `listing_ttl`.
//!
//! Every invalidation bumps an epoch. A miss records the epoch before calling
//! the catalog and only stores the answer if no invalidation happened in the
//! meantime, so a stale in-flight result cannot overwrite a fresh invalidation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::{CatalogError, SubjectCacheInvalidation, SubjectCatalogService, SubjectInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub subject_ttl: Duration,
    pub listing_ttl: Duration,
    /// Bound on every catalog call; exceeding it fails closed.
    pub lookup_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            subject_ttl: Duration::from_secs(300),
            listing_ttl: Duration::from_secs(60),
            lookup_timeout: Duration::from_secs(2),
        }
    }
}

/// Answer to "is this subject usable for scheduling?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectLookup {
    pub exists: bool,
    pub active: bool,
    pub name: Option<String>,
    pub school_id: Option<String>,
}

impl SubjectLookup {
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            exists: false,
            active: false,
            name: None,
            school_id: None,
        }
    }

    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.exists && self.active
    }
}

impl From<&SubjectInfo> for SubjectLookup {
    fn from(info: &SubjectInfo) -> Self {
        Self {
            exists: true,
            active: info.active,
            name: Some(info.name.clone()),
            school_id: Some(info.school_id.clone()),
        }
    }
}

/// Counters since the cache was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub subject_hits: u64,
    pub subject_misses: u64,
    pub listing_hits: u64,
    pub listing_misses: u64,
    pub evictions: u64,
    /// Results dropped because an invalidation raced the catalog call.
    pub discarded: u64,
}

struct Cached<T> {
    value: T,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheState {
    subjects: HashMap<String, Cached<SubjectInfo>>,
    listings: HashMap<String, Cached<Vec<SubjectInfo>>>,
    epoch: u64,
    stats: CacheStats,
}

pub struct SubjectLookupCache {
    catalog: Arc<dyn SubjectCatalogService>,
    settings: CacheSettings,
    state: Mutex<CacheState>,
}

impl SubjectLookupCache {
    #[must_use]
    pub fn new(catalog: Arc<dyn SubjectCatalogService>, settings: CacheSettings) -> Self {
        Self {
            catalog,
            settings,
            state: Mutex::new(CacheState::default()),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, CatalogError>>,
    ) -> Result<T, CatalogError> {
        tokio::time::timeout(self.settings.lookup_timeout, call)
            .await
            .map_err(|_| CatalogError::Timeout(self.settings.lookup_timeout))?
    }

    /// Resolve a subject, consulting the catalog on a miss.
    ///
    /// # Errors
    ///
    /// `CatalogError::Timeout` if the catalog does not answer within the
    /// lookup timeout; `CatalogError::Unavailable` if it fails.
    pub async fn lookup(&self, subject_id: &str) -> Result<SubjectLookup, CatalogError> {
        let epoch = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let now = Instant::now();
            match state.subjects.get(subject_id) {
                Some(cached) if cached.expires_at > now => {
                    let found = SubjectLookup::from(&cached.value);
                    state.stats.subject_hits += 1;
                    tracing::debug!(subject_id, "subject cache hit");
                    return Ok(found);
                }
                Some(_) => {
                    state.subjects.remove(subject_id);
                    state.stats.evictions += 1;
                }
                None => {}
            }
            state.stats.subject_misses += 1;
            state.epoch
        };
        tracing::debug!(subject_id, "subject cache miss");

        let fetched = self.bounded(self.catalog.get_subject(subject_id)).await;
        let info = match fetched {
            Ok(Some(info)) => info,
            Ok(None) => return Ok(SubjectLookup::missing()),
            Err(e) => {
                tracing::warn!(subject_id, error = %e, "subject lookup failed");
                return Err(e);
            }
        };

        let lookup = SubjectLookup::from(&info);
        let mut state = self.state.lock();
        if state.epoch == epoch {
            tracing::debug!(subject_id, "subject cached");
            state.subjects.insert(
                subject_id.to_string(),
                Cached {
                    value: info,
                    expires_at: Instant::now() + self.settings.subject_ttl,
                },
            );
        } else {
            state.stats.discarded += 1;
            tracing::debug!(subject_id, "subject result discarded after invalidation");
        }
        Ok(lookup)
    }

    /// Active subjects of a school, cached per school.
    ///
    /// # Errors
    ///
    /// Same as [`SubjectLookupCache::lookup`].
    pub async fn active_subjects(&self, school_id: &str) -> Result<Vec<SubjectInfo>, CatalogError> {
        let epoch = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let now = Instant::now();
            match state.listings.get(school_id) {
                Some(cached) if cached.expires_at > now => {
                    let list = cached.value.clone();
                    state.stats.listing_hits += 1;
                    tracing::debug!(school_id, "listing cache hit");
                    return Ok(list);
                }
                Some(_) => {
                    state.listings.remove(school_id);
                    state.stats.evictions += 1;
                }
                None => {}
            }
            state.stats.listing_misses += 1;
            state.epoch
        };
        tracing::debug!(school_id, "listing cache miss");

        let list = self
            .bounded(self.catalog.list_active_subjects(school_id))
            .await?;

        let mut state = self.state.lock();
        if state.epoch == epoch {
            state.listings.insert(
                school_id.to_string(),
                Cached {
                    value: list.clone(),
                    expires_at: Instant::now() + self.settings.listing_ttl,
                },
            );
        } else {
            state.stats.discarded += 1;
        }
        Ok(list)
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;
        let dropped = state.subjects.len() + state.listings.len();
        state.subjects.clear();
        state.listings.clear();
        state.stats.evictions += u64::try_from(dropped).unwrap_or(u64::MAX);
    }
}

impl SubjectCacheInvalidation for SubjectLookupCache {
    /// Evict the subject, and the listing of its school when known.
    fn invalidate_subject(&self, subject_id: &str) {
        let mut state = self.state.lock();
        state.epoch += 1;
        if let Some(removed) = state.subjects.remove(subject_id) {
            state.stats.evictions += 1;
            if state.listings.remove(&removed.value.school_id).is_some() {
                state.stats.evictions += 1;
            }
        }
        tracing::debug!(subject_id, "subject invalidated");
    }

    fn invalidate_school_listing(&self, school_id: &str) {
        let mut state = self.state.lock();
        state.epoch += 1;
        if state.listings.remove(school_id).is_some() {
            state.stats.evictions += 1;
        }
        tracing::debug!(school_id, "school listing invalidated");
    }
}
