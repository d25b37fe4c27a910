//! # schola-db
//!
//! libSQL storage adapter for the Schola scheduling core.
//!
//! Holds schedule entries, class sections with their enrollment records, the
//! transactional fact outbox and a local subject catalog. Every write runs in
//! a [`store::LibsqlTx`] opened with `BEGIN IMMEDIATE`, and overlap/capacity
//! triggers reject rows that slip past the application checks.
//!
//! File databases hand each session its own connection and rely on `SQLite`
//! locking. A `:memory:` database exists only on its primary connection, so
//! sessions share that connection and queue on an async lock instead.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod sink;
pub mod store;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use error::DatabaseError;
use libsql::Builder;
use schola_config::{DatabaseConfig, MEMORY_PATH};
use tokio::sync::{Mutex, OwnedMutexGuard};

pub use repos::outbox::FactFilter;
pub use repos::schedule::EntryFilter;
pub use repos::subject::DbSubjectCatalog;
pub use sink::JsonlFactSink;
pub use store::{LibsqlStore, LibsqlTx};

/// Central database handle.
pub struct ScholaDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    memory: bool,
    busy_timeout_ms: u64,
    write_lock: Arc<Mutex<()>>,
}

/// A connection checked out for one unit of work or one read.
///
/// For in-memory databases the session also holds the write lock until it is
/// dropped.
pub struct DbSession {
    conn: libsql::Connection,
    _guard: Option<OwnedMutexGuard<()>>,
}

impl DbSession {
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}

impl ScholaDb {
    /// Open a local database at the given path, or `:memory:`.
    ///
    /// Runs migrations automatically on first open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str, busy_timeout_ms: u64) -> Result<Self, DatabaseError> {
        let memory = path == MEMORY_PATH;
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        configure(&conn, busy_timeout_ms).await?;
        if !memory {
            conn.query("PRAGMA journal_mode = WAL", ())
                .await
                .map_err(|e| DatabaseError::Migration(format!("PRAGMA journal_mode: {e}")))?;
        }

        let schola_db = Self {
            db,
            conn,
            memory,
            busy_timeout_ms,
            write_lock: Arc::new(Mutex::new(())),
        };
        schola_db.run_migrations().await?;
        tracing::debug!(path, memory, "database opened");
        Ok(schola_db)
    }

    /// Open the database described by the configuration, creating the parent
    /// directory of a file database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created or the
    /// database cannot be opened.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        if let Some(parent) = config.file_path().as_deref().and_then(std::path::Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::open_local(&config.path, config.busy_timeout_ms).await
    }

    /// The primary connection. Used for migrations and schema inspection.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    #[must_use]
    pub const fn is_memory(&self) -> bool {
        self.memory
    }

    /// Check out a connection.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a new connection cannot be configured, or if
    /// a transaction abandoned on the shared connection cannot be rolled back.
    pub async fn session(&self) -> Result<DbSession, DatabaseError> {
        if self.memory {
            let guard = Arc::clone(&self.write_lock).lock_owned().await;
            if !self.conn.is_autocommit() {
                tracing::warn!("rolling back a transaction abandoned on the shared connection");
                self.conn.execute("ROLLBACK", ()).await?;
            }
            return Ok(DbSession {
                conn: self.conn.clone(),
                _guard: Some(guard),
            });
        }
        let conn = self.db.connect()?;
        configure(&conn, self.busy_timeout_ms).await?;
        Ok(DbSession { conn, _guard: None })
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"sch-a3f8b2c1"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let session = self.session().await?;
        generate_id_on(session.conn(), prefix).await
    }
}

/// Per-connection pragmas.
async fn configure(conn: &libsql::Connection, busy_timeout_ms: u64) -> Result<(), DatabaseError> {
    conn.execute("PRAGMA foreign_keys = ON", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;
    conn.query(&format!("PRAGMA busy_timeout = {busy_timeout_ms}"), ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("PRAGMA busy_timeout: {e}")))?;
    Ok(())
}

/// Uses `randomblob(4)` in SQL to produce 8-char hex, then prepends the prefix.
pub(crate) async fn generate_id_on(
    conn: &libsql::Connection,
    prefix: &str,
) -> Result<String, DatabaseError> {
    let mut rows = conn
        .query("SELECT ?1 || '-' || lower(hex(randomblob(4)))", [prefix])
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(row.get::<String>(0)?)
}
