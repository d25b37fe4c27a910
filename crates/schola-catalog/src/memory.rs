use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::{CatalogError, CatalogNotifier, SubjectCatalogService, SubjectInfo};

/// Catalog held in memory. Supports an artificial delay and failure
/// injection so cache timeouts and fail-closed behaviour can be exercised.
#[derive(Default)]
pub struct InMemoryCatalog {
    subjects: RwLock<BTreeMap<String, SubjectInfo>>,
    delay: Mutex<Option<Duration>>,
    failing: AtomicBool,
    calls: AtomicUsize,
    notifier: CatalogNotifier,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog that announces its changes through `notifier`.
    #[must_use]
    pub fn with_notifier(notifier: CatalogNotifier) -> Self {
        Self {
            notifier,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn notifier(&self) -> &CatalogNotifier {
        &self.notifier
    }

    /// Insert or replace a subject, then notify listeners.
    pub fn insert(&self, subject: SubjectInfo) {
        let (id, school) = (subject.id.clone(), subject.school_id.clone());
        self.subjects.write().insert(id.clone(), subject);
        self.notifier.subject_changed(&id, &school);
    }

    /// Flip a subject's active flag. Returns `false` if it does not exist.
    pub fn set_active(&self, subject_id: &str, active: bool) -> bool {
        let school = {
            let mut subjects = self.subjects.write();
            let Some(subject) = subjects.get_mut(subject_id) else {
                return false;
            };
            subject.active = active;
            subject.school_id.clone()
        };
        self.notifier.subject_changed(subject_id, &school);
        true
    }

    /// Delay every subsequent call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Make every subsequent call fail with `Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of catalog calls served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("catalog offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SubjectCatalogService for InMemoryCatalog {
    async fn get_subject(&self, id: &str) -> Result<Option<SubjectInfo>, CatalogError> {
        self.enter().await?;
        Ok(self.subjects.read().get(id).cloned())
    }

    async fn list_active_subjects(&self, school_id: &str) -> Result<Vec<SubjectInfo>, CatalogError> {
        self.enter().await?;
        Ok(self
            .subjects
            .read()
            .values()
            .filter(|s| s.active && s.school_id == school_id)
            .cloned()
            .collect())
    }
}
