//! Schedule entry repository.

use async_trait::async_trait;
use schola_core::entities::{ScheduleEntry, ScheduleEntryParts};
use schola_core::enums::{EntryStatus, Weekday};
use schola_core::period::AcademicPeriod;
use schola_core::ports::{ScheduleRepository, StoreError};
use schola_core::time_slot::TimeSlot;

use crate::error::DatabaseError;
use crate::helpers::{get_int, get_opt_string, parse_datetime, parse_enum};
use crate::store::{LibsqlStore, LibsqlTx};

const SELECT_COLS: &str = "id, section_id, subject_id, teacher_id, room, day, start_minute, \
     end_minute, year, term, status, created_at, updated_at";

/// Filter criteria for schedule listings.
#[derive(Debug, Default, Clone)]
pub struct EntryFilter {
    pub section_id: Option<String>,
    pub teacher_id: Option<String>,
    pub room: Option<String>,
    pub period: Option<AcademicPeriod>,
    pub active_only: bool,
    pub limit: Option<u32>,
}

fn row_to_entry(row: &libsql::Row) -> Result<ScheduleEntry, DatabaseError> {
    let day = Weekday::from_number(row.get::<i64>(5)?)?;
    let slot = TimeSlot::rehydrate(day, get_int(row, 6)?, get_int(row, 7)?)?;
    let period = AcademicPeriod::new(get_int(row, 8)?, row.get::<i64>(9)?)?;
    let parts = ScheduleEntryParts {
        id: row.get::<String>(0)?,
        section_id: row.get::<String>(1)?,
        subject_id: row.get::<String>(2)?,
        teacher_id: row.get::<String>(3)?,
        room: get_opt_string(row, 4)?,
        slot,
        period,
        status: parse_enum::<EntryStatus>(&row.get::<String>(10)?)?,
        created_at: parse_datetime(&row.get::<String>(11)?)?,
        updated_at: parse_datetime(&row.get::<String>(12)?)?,
    };
    Ok(ScheduleEntry::rehydrate(parts)?)
}

async fn collect_entries(mut rows: libsql::Rows) -> Result<Vec<ScheduleEntry>, DatabaseError> {
    let mut entries = Vec::new();
    while let Some(row) = rows.next().await? {
        entries.push(row_to_entry(&row)?);
    }
    Ok(entries)
}

impl LibsqlTx {
    async fn find_active_by(
        &self,
        column: &str,
        value: &str,
        period: AcademicPeriod,
    ) -> Result<Vec<ScheduleEntry>, DatabaseError> {
        let sql = format!(
            "SELECT {SELECT_COLS} FROM schedule_entries
             WHERE {column} = ?1 AND year = ?2 AND term = ?3 AND status = 'active'
             ORDER BY day, start_minute"
        );
        let rows = self
            .conn()
            .query(
                &sql,
                libsql::params![value, i64::from(period.year), i64::from(period.term.number())],
            )
            .await?;
        collect_entries(rows).await
    }

    async fn insert_entry_db(&self, entry: &ScheduleEntry) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO schedule_entries (id, section_id, subject_id, teacher_id, room, day,
                     start_minute, end_minute, year, term, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                libsql::params![
                    entry.id(),
                    entry.section_id(),
                    entry.subject_id(),
                    entry.teacher_id(),
                    entry.room(),
                    i64::from(entry.slot().day().number()),
                    i64::from(entry.slot().start_minute()),
                    i64::from(entry.slot().end_minute()),
                    i64::from(entry.period().year),
                    i64::from(entry.period().term.number()),
                    entry.status().as_str(),
                    entry.created_at().to_rfc3339(),
                    entry.updated_at().to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_entry_db(&self, entry: &ScheduleEntry) -> Result<u64, DatabaseError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE schedule_entries
                 SET teacher_id = ?2, room = ?3, day = ?4, start_minute = ?5, end_minute = ?6,
                     status = ?7, updated_at = ?8
                 WHERE id = ?1",
                libsql::params![
                    entry.id(),
                    entry.teacher_id(),
                    entry.room(),
                    i64::from(entry.slot().day().number()),
                    i64::from(entry.slot().start_minute()),
                    i64::from(entry.slot().end_minute()),
                    entry.status().as_str(),
                    entry.updated_at().to_rfc3339()
                ],
            )
            .await?;
        Ok(changed)
    }
}

#[async_trait]
impl ScheduleRepository for LibsqlTx {
    async fn get_entry(&self, id: &str) -> Result<Option<ScheduleEntry>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM schedule_entries WHERE id = ?1"),
                [id],
            )
            .await
            .map_err(DatabaseError::from)?;
        match rows.next().await.map_err(DatabaseError::from)? {
            Some(row) => Ok(Some(row_to_entry(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_active_by_teacher(
        &self,
        teacher_id: &str,
        period: AcademicPeriod,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(self.find_active_by("teacher_id", teacher_id, period).await?)
    }

    async fn find_active_by_room(
        &self,
        room: &str,
        period: AcademicPeriod,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(self.find_active_by("room", room, period).await?)
    }

    async fn find_active_by_section(
        &self,
        section_id: &str,
        period: AcademicPeriod,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(self.find_active_by("section_id", section_id, period).await?)
    }

    async fn insert_entry(&self, entry: &ScheduleEntry) -> Result<(), StoreError> {
        Ok(self.insert_entry_db(entry).await?)
    }

    async fn update_entry(&self, entry: &ScheduleEntry) -> Result<(), StoreError> {
        if self.update_entry_db(entry).await? == 0 {
            return Err(StoreError::not_found("schedule_entry", entry.id()));
        }
        Ok(())
    }
}

impl LibsqlStore {
    /// List entries with optional filters, ordered by period, day and start.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a row is corrupt.
    pub async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<ScheduleEntry>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref section) = filter.section_id {
            params.push(libsql::Value::Text(section.clone()));
            conditions.push(format!("section_id = ?{}", params.len()));
        }
        if let Some(ref teacher) = filter.teacher_id {
            params.push(libsql::Value::Text(teacher.clone()));
            conditions.push(format!("teacher_id = ?{}", params.len()));
        }
        if let Some(ref room) = filter.room {
            params.push(libsql::Value::Text(room.clone()));
            conditions.push(format!("room = ?{}", params.len()));
        }
        if let Some(period) = filter.period {
            params.push(libsql::Value::Integer(i64::from(period.year)));
            conditions.push(format!("year = ?{}", params.len()));
            params.push(libsql::Value::Integer(i64::from(period.term.number())));
            conditions.push(format!("term = ?{}", params.len()));
        }
        if filter.active_only {
            conditions.push("status = 'active'".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit = filter.limit.unwrap_or(500);
        let sql = format!(
            "SELECT {SELECT_COLS} FROM schedule_entries {where_clause}
             ORDER BY year, term, day, start_minute, id LIMIT {limit}"
        );

        let session = self.db().session().await?;
        let rows = session
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        collect_entries(rows).await
    }

    /// Fetch one entry outside a transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or the row is corrupt.
    pub async fn find_entry(&self, id: &str) -> Result<Option<ScheduleEntry>, DatabaseError> {
        let session = self.db().session().await?;
        let mut rows = session
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM schedule_entries WHERE id = ?1"),
                [id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_entry(&row)?)),
            None => Ok(None),
        }
    }
}
