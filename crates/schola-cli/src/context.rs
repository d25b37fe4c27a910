use std::sync::Arc;

use anyhow::Context;
use schola_catalog::{CacheSettings, CatalogNotifier, SubjectLookupCache};
use schola_config::ScholaConfig;
use schola_db::{DbSubjectCatalog, LibsqlStore, ScholaDb};
use schola_scheduler::{EnrollmentService, SchedulingService};

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub config: ScholaConfig,
    pub store: LibsqlStore,
    pub subjects: DbSubjectCatalog,
    pub subject_cache: Arc<SubjectLookupCache>,
    pub scheduling: SchedulingService<LibsqlStore>,
    pub enrollment: EnrollmentService<LibsqlStore>,
}

impl AppContext {
    pub async fn init(config: ScholaConfig) -> anyhow::Result<Self> {
        let db = ScholaDb::open(&config.database)
            .await
            .with_context(|| format!("failed to open database '{}'", config.database.path))?;
        let db = Arc::new(db);
        let store = LibsqlStore::new(Arc::clone(&db));

        let notifier = CatalogNotifier::new();
        let subjects = DbSubjectCatalog::new(db, notifier.clone());
        let subject_cache = Arc::new(SubjectLookupCache::new(
            Arc::new(subjects.clone()),
            CacheSettings {
                subject_ttl: config.catalog.subject_ttl(),
                listing_ttl: config.catalog.listing_ttl(),
                lookup_timeout: config.catalog.lookup_timeout(),
            },
        ));
        notifier.subscribe(&subject_cache);

        let policy = config.policy.to_policy()?;
        let retry = config.retry.to_policy();
        let scheduling = SchedulingService::new(store.clone(), Arc::clone(&subject_cache), policy.clone())
            .with_retry(retry);
        let enrollment = EnrollmentService::new(store.clone(), policy).with_retry(retry);

        tracing::debug!(db = %config.database.path, "application context ready");
        Ok(Self {
            config,
            store,
            subjects,
            subject_cache,
            scheduling,
            enrollment,
        })
    }
}
