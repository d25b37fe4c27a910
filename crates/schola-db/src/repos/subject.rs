//! Local subject catalog.
//!
//! Backs `SubjectCatalogService` with the `subjects` table. Writes go through
//! this type so the registered caches are invalidated right after commit.

use std::sync::Arc;

use async_trait::async_trait;
use schola_catalog::{CatalogError, CatalogNotifier, SubjectCatalogService, SubjectInfo};
use schola_core::ids::PREFIX_SUBJECT;

use crate::error::DatabaseError;
use crate::helpers::get_bool;
use crate::{ScholaDb, generate_id_on};

/// Subject catalog stored next to the schedule.
#[derive(Clone)]
pub struct DbSubjectCatalog {
    db: Arc<ScholaDb>,
    notifier: CatalogNotifier,
}

fn row_to_subject(row: &libsql::Row) -> Result<SubjectInfo, DatabaseError> {
    Ok(SubjectInfo {
        id: row.get::<String>(0)?,
        school_id: row.get::<String>(1)?,
        name: row.get::<String>(2)?,
        active: get_bool(row, 3)?,
    })
}

fn unavailable(e: DatabaseError) -> CatalogError {
    CatalogError::Unavailable(e.to_string())
}

impl DbSubjectCatalog {
    #[must_use]
    pub const fn new(db: Arc<ScholaDb>, notifier: CatalogNotifier) -> Self {
        Self { db, notifier }
    }

    #[must_use]
    pub const fn notifier(&self) -> &CatalogNotifier {
        &self.notifier
    }

    /// Register a subject. New subjects start active.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the insert fails.
    pub async fn create_subject(&self, school_id: &str, name: &str) -> Result<SubjectInfo, DatabaseError> {
        let session = self.db.session().await?;
        let id = generate_id_on(session.conn(), PREFIX_SUBJECT).await?;
        session
            .conn()
            .execute(
                "INSERT INTO subjects (id, school_id, name, active) VALUES (?1, ?2, ?3, 1)",
                libsql::params![id.as_str(), school_id, name],
            )
            .await?;
        drop(session);
        self.notifier.school_listing_changed(school_id);
        tracing::info!(subject_id = %id, school_id, "subject created");
        Ok(SubjectInfo {
            id,
            school_id: school_id.to_string(),
            name: name.to_string(),
            active: true,
        })
    }

    /// Flip a subject's active flag and invalidate caches.
    /// Returns `None` if the subject does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the update fails.
    pub async fn set_subject_active(
        &self,
        id: &str,
        active: bool,
    ) -> Result<Option<SubjectInfo>, DatabaseError> {
        let subject = {
            let session = self.db.session().await?;
            session
                .conn()
                .execute(
                    "UPDATE subjects SET active = ?2, updated_at = datetime('now') WHERE id = ?1",
                    libsql::params![id, i64::from(active)],
                )
                .await?;
            find_on(session.conn(), id).await?
        };
        if let Some(ref s) = subject {
            self.notifier.subject_changed(&s.id, &s.school_id);
            tracing::info!(subject_id = %s.id, active, "subject updated");
        }
        Ok(subject)
    }
}

async fn find_on(conn: &libsql::Connection, id: &str) -> Result<Option<SubjectInfo>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT id, school_id, name, active FROM subjects WHERE id = ?1",
            [id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_subject(&row)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl SubjectCatalogService for DbSubjectCatalog {
    async fn get_subject(&self, id: &str) -> Result<Option<SubjectInfo>, CatalogError> {
        let session = self.db.session().await.map_err(unavailable)?;
        find_on(session.conn(), id).await.map_err(unavailable)
    }

    async fn list_active_subjects(&self, school_id: &str) -> Result<Vec<SubjectInfo>, CatalogError> {
        let session = self.db.session().await.map_err(unavailable)?;
        let mut rows = session
            .conn()
            .query(
                "SELECT id, school_id, name, active FROM subjects
                 WHERE school_id = ?1 AND active = 1 ORDER BY name",
                [school_id],
            )
            .await
            .map_err(|e| unavailable(e.into()))?;
        let mut subjects = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| unavailable(e.into()))? {
            subjects.push(row_to_subject(&row).map_err(unavailable)?);
        }
        Ok(subjects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schola_catalog::{CacheSettings, SubjectLookupCache};
    use schola_config::MEMORY_PATH;

    async fn catalog() -> (DbSubjectCatalog, CatalogNotifier) {
        let db = Arc::new(ScholaDb::open_local(MEMORY_PATH, 5000).await.unwrap());
        let notifier = CatalogNotifier::new();
        (DbSubjectCatalog::new(db, notifier.clone()), notifier)
    }

    #[tokio::test]
    async fn create_and_list() {
        let (catalog, _) = catalog().await;
        let math = catalog.create_subject("school-1", "Mathematics").await.unwrap();
        catalog.create_subject("school-1", "Art").await.unwrap();
        catalog.create_subject("school-2", "Biology").await.unwrap();

        let found = catalog.get_subject(&math.id).await.unwrap().unwrap();
        assert_eq!(found, math);
        let names: Vec<String> = catalog
            .list_active_subjects("school-1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Art", "Mathematics"]);
        assert!(catalog.get_subject("sub-00000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deactivation_invalidates_subscribed_cache() {
        let (catalog, notifier) = catalog().await;
        let math = catalog.create_subject("school-1", "Mathematics").await.unwrap();

        let cache = Arc::new(SubjectLookupCache::new(
            Arc::new(catalog.clone()),
            CacheSettings::default(),
        ));
        notifier.subscribe(&cache);
        assert!(cache.lookup(&math.id).await.unwrap().is_usable());

        let updated = catalog.set_subject_active(&math.id, false).await.unwrap().unwrap();
        assert!(!updated.active);
        let after = cache.lookup(&math.id).await.unwrap();
        assert!(after.exists);
        assert!(!after.active);
    }

    #[tokio::test]
    async fn set_active_on_missing_subject() {
        let (catalog, _) = catalog().await;
        assert!(catalog.set_subject_active("sub-ffffffff", false).await.unwrap().is_none());
    }
}
