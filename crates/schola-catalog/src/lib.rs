//! # schola-catalog
//!
//! The scheduling core's only contract with the academic catalog.
//!
//! - [`SubjectCatalogService`]: the port to whatever owns subjects
//! - [`SubjectLookupCache`]: read-through cache with TTLs, a timeout on every
//!   catalog call, and explicit invalidation
//! - [`SubjectCacheInvalidation`] / [`CatalogNotifier`]: the synchronous hook
//!   the catalog owner calls when a subject changes
//! - [`InMemoryCatalog`]: a catalog for tests and local runs

mod cache;
mod memory;
mod notifier;

pub use cache::{CacheSettings, CacheStats, SubjectLookup, SubjectLookupCache};
pub use memory::InMemoryCatalog;
pub use notifier::CatalogNotifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Read-only projection of a subject owned by the academic catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub id: String,
    pub school_id: String,
    pub name: String,
    pub active: bool,
}

/// Errors from catalog calls. Both kinds are transient from the caller's
/// point of view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Catalog call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// The academic catalog as seen by scheduling.
#[async_trait]
pub trait SubjectCatalogService: Send + Sync {
    /// `Ok(None)` when the subject does not exist.
    async fn get_subject(&self, id: &str) -> Result<Option<SubjectInfo>, CatalogError>;

    async fn list_active_subjects(&self, school_id: &str) -> Result<Vec<SubjectInfo>, CatalogError>;
}

/// Invalidation hook exposed by caches of catalog data.
pub trait SubjectCacheInvalidation: Send + Sync {
    fn invalidate_subject(&self, subject_id: &str);

    fn invalidate_school_listing(&self, school_id: &str);
}
