//! Database migration runner.
//!
//! Embeds the SQL migration files at compile time and executes them on
//! database open. All statements use `IF NOT EXISTS` for idempotent re-running.

use crate::ScholaDb;
use crate::error::DatabaseError;

/// Sections, enrollments, schedule entries, overlap and capacity triggers.
const MIGRATION_001: &str = include_str!("../migrations/001_schedule.sql");
/// Fact outbox and subject catalog.
const MIGRATION_002: &str = include_str!("../migrations/002_outbox_catalog.sql");

impl ScholaDb {
    /// Run all embedded migrations in sequence.
    pub(crate) async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.conn()
            .execute_batch(MIGRATION_001)
            .await
            .map_err(|e| DatabaseError::Migration(format!("001_schedule: {e}")))?;
        self.conn()
            .execute_batch(MIGRATION_002)
            .await
            .map_err(|e| DatabaseError::Migration(format!("002_outbox_catalog: {e}")))?;
        Ok(())
    }
}
