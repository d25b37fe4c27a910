use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::SubjectCacheInvalidation;

/// Fan-out of catalog change notifications to registered caches.
///
/// The catalog owner calls [`CatalogNotifier::subject_changed`] after it
/// commits a change to a subject; every listener is invalidated synchronously
/// before the call returns.
///
/// Listeners are held weakly, since a cache usually owns the catalog that
/// owns this notifier. Dropped listeners are pruned on the next notification.
#[derive(Clone, Default)]
pub struct CatalogNotifier {
    listeners: Arc<RwLock<Vec<Weak<dyn SubjectCacheInvalidation>>>>,
}

impl CatalogNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<L: SubjectCacheInvalidation + 'static>(&self, listener: &Arc<L>) {
        let weak: Weak<dyn SubjectCacheInvalidation> = Arc::downgrade(listener) as Weak<L>;
        self.listeners.write().push(weak);
    }

    /// Number of listeners that are still alive.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .iter()
            .filter(|l| l.strong_count() > 0)
            .count()
    }

    /// Invalidate a subject and its school's listing in every listener.
    pub fn subject_changed(&self, subject_id: &str, school_id: &str) {
        for listener in self.live() {
            listener.invalidate_subject(subject_id);
            listener.invalidate_school_listing(school_id);
        }
    }

    pub fn school_listing_changed(&self, school_id: &str) {
        for listener in self.live() {
            listener.invalidate_school_listing(school_id);
        }
    }

    /// Upgrade live listeners and drop the rest. Callbacks run outside the lock.
    fn live(&self) -> Vec<Arc<dyn SubjectCacheInvalidation>> {
        let mut listeners = self.listeners.write();
        let live: Vec<_> = listeners.iter().filter_map(Weak::upgrade).collect();
        if live.len() != listeners.len() {
            listeners.retain(|l| l.strong_count() > 0);
            tracing::debug!(live = live.len(), "pruned dropped catalog listeners");
        }
        live
    }
}

impl std::fmt::Debug for CatalogNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
