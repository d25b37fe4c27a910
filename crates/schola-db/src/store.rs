//! Unit of work over libSQL.
//!
//! `LibsqlStore::begin` checks out a session and issues `BEGIN IMMEDIATE`,
//! taking the database write lock up front so the conflict scan and the
//! write that follows it see a stable snapshot. The repository traits are
//! implemented for `LibsqlTx` in `repos/`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schola_core::facts::StoredFact;
use schola_core::ports::{FactFeed, ScheduleStore, StoreError, UnitOfWork};

use crate::error::DatabaseError;
use crate::{DbSession, ScholaDb, generate_id_on};

/// Storage entry point shared by the scheduling services.
#[derive(Clone)]
pub struct LibsqlStore {
    db: Arc<ScholaDb>,
}

impl LibsqlStore {
    #[must_use]
    pub const fn new(db: Arc<ScholaDb>) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn db(&self) -> &ScholaDb {
        &self.db
    }

    /// Open a transaction, keeping the database-level error.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if no session is available or `BEGIN` fails.
    pub async fn begin_tx(&self) -> Result<LibsqlTx, DatabaseError> {
        let session = self.db.session().await?;
        session.conn().execute("BEGIN IMMEDIATE", ()).await?;
        Ok(LibsqlTx {
            session,
            done: false,
        })
    }
}

#[async_trait]
impl ScheduleStore for LibsqlStore {
    type Tx = LibsqlTx;

    async fn begin(&self) -> Result<LibsqlTx, StoreError> {
        Ok(self.begin_tx().await?)
    }
}

#[async_trait]
impl FactFeed for LibsqlStore {
    async fn pending_facts(&self, limit: usize) -> Result<Vec<StoredFact>, StoreError> {
        Ok(self.pending_facts_db(limit).await?)
    }

    async fn mark_delivered(&self, fact_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        Ok(self.mark_delivered_db(fact_id, at).await?)
    }
}

/// One open `BEGIN IMMEDIATE` transaction.
///
/// Dropping without `commit` discards every write: a file connection closes
/// and `SQLite` rolls back, and the shared in-memory connection is rolled back
/// by the next session that checks it out.
pub struct LibsqlTx {
    session: DbSession,
    done: bool,
}

impl LibsqlTx {
    pub(crate) const fn conn(&self) -> &libsql::Connection {
        self.session.conn()
    }
}

impl std::fmt::Debug for LibsqlTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibsqlTx").field("done", &self.done).finish_non_exhaustive()
    }
}

#[async_trait]
impl UnitOfWork for LibsqlTx {
    async fn generate_id(&self, prefix: &str) -> Result<String, StoreError> {
        Ok(generate_id_on(self.conn(), prefix).await?)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if let Err(e) = self.conn().execute("COMMIT", ()).await {
            tracing::warn!(error = %e, "commit failed, rolling back");
            let _ = self.conn().execute("ROLLBACK", ()).await;
            return Err(DatabaseError::from(e).into());
        }
        self.done = true;
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError> {
        self.conn()
            .execute("ROLLBACK", ())
            .await
            .map_err(DatabaseError::from)?;
        self.done = true;
        Ok(())
    }
}

impl Drop for LibsqlTx {
    fn drop(&mut self) {
        if !self.done {
            tracing::debug!("transaction dropped without commit; writes discarded");
        }
    }
}
