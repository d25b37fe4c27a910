//! Class section repository.
//!
//! A section row carries capacity, shift and the optimistic-concurrency
//! `version`; the roster lives in `enrollments`, where ending an enrollment
//! flips `active` to 0 instead of deleting the record.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use schola_core::entities::{ClassSection, ClassSectionParts};
use schola_core::enums::Shift;
use schola_core::ids::PREFIX_ENROLLMENT;
use schola_core::ports::{ClassSectionRepository, StoreError};

use crate::error::DatabaseError;
use crate::generate_id_on;
use crate::helpers::{get_bool, get_int, parse_datetime, parse_enum};
use crate::store::{LibsqlStore, LibsqlTx};

async fn active_students(
    conn: &libsql::Connection,
    section_id: &str,
) -> Result<BTreeSet<String>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT student_id FROM enrollments WHERE section_id = ?1 AND active = 1",
            [section_id],
        )
        .await?;
    let mut students = BTreeSet::new();
    while let Some(row) = rows.next().await? {
        students.insert(row.get::<String>(0)?);
    }
    Ok(students)
}

async fn load_section_on(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<ClassSection>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT id, name, capacity, year, shift, active, version, created_at, updated_at
             FROM class_sections WHERE id = ?1",
            [id],
        )
        .await?;
    let Some(row) = rows.next().await? else {
        return Ok(None);
    };
    let parts = ClassSectionParts {
        id: row.get::<String>(0)?,
        name: row.get::<String>(1)?,
        capacity: get_int(&row, 2)?,
        year: get_int(&row, 3)?,
        shift: parse_enum::<Shift>(&row.get::<String>(4)?)?,
        active: get_bool(&row, 5)?,
        enrolled: active_students(conn, id).await?,
        version: row.get::<i64>(6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    };
    Ok(Some(ClassSection::rehydrate(parts)?))
}

impl LibsqlTx {
    async fn insert_enrollment(&self, section_id: &str, student_id: &str) -> Result<(), DatabaseError> {
        let id = generate_id_on(self.conn(), PREFIX_ENROLLMENT).await?;
        self.conn()
            .execute(
                "INSERT INTO enrollments (id, section_id, student_id, active, enrolled_at)
                 VALUES (?1, ?2, ?3, 1, ?4)",
                libsql::params![id, section_id, student_id, Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    async fn insert_section_db(&self, section: &ClassSection) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO class_sections (id, name, capacity, year, shift, active, version,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                libsql::params![
                    section.id(),
                    section.name(),
                    i64::from(section.capacity()),
                    i64::from(section.year()),
                    section.shift().as_str(),
                    i64::from(section.is_active()),
                    section.version(),
                    section.created_at().to_rfc3339(),
                    section.updated_at().to_rfc3339()
                ],
            )
            .await?;
        for student in section.enrolled_students() {
            self.insert_enrollment(section.id(), student).await?;
        }
        Ok(())
    }

    /// Bump the version if it still matches. Returns the number of rows hit.
    async fn claim_version(&self, section: &ClassSection) -> Result<u64, DatabaseError> {
        Ok(self
            .conn()
            .execute(
                "UPDATE class_sections
                 SET name = ?3, year = ?4, shift = ?5, active = ?6, updated_at = ?7,
                     version = version + 1
                 WHERE id = ?1 AND version = ?2",
                libsql::params![
                    section.id(),
                    section.version(),
                    section.name(),
                    i64::from(section.year()),
                    section.shift().as_str(),
                    i64::from(section.is_active()),
                    section.updated_at().to_rfc3339()
                ],
            )
            .await?)
    }

    async fn section_exists(&self, id: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT 1 FROM class_sections WHERE id = ?1", [id])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    /// Apply the roster diff and capacity. Removals go first so a capacity
    /// drop is measured against the shrunken roster.
    async fn write_roster(&self, section: &ClassSection) -> Result<(), DatabaseError> {
        let stored = active_students(self.conn(), section.id()).await?;
        let wanted = section.enrolled_students();
        let now = Utc::now().to_rfc3339();

        for student in stored.difference(wanted) {
            self.conn()
                .execute(
                    "UPDATE enrollments SET active = 0, ended_at = ?3
                     WHERE section_id = ?1 AND student_id = ?2 AND active = 1",
                    libsql::params![section.id(), student.as_str(), now.as_str()],
                )
                .await?;
        }
        self.conn()
            .execute(
                "UPDATE class_sections SET capacity = ?2 WHERE id = ?1 AND capacity <> ?2",
                libsql::params![section.id(), i64::from(section.capacity())],
            )
            .await?;
        for student in wanted.difference(&stored) {
            self.insert_enrollment(section.id(), student).await?;
        }
        Ok(())
    }
}

fn with_section_id(err: StoreError, section_id: &str) -> StoreError {
    match err {
        StoreError::CapacityExceeded { .. } => StoreError::CapacityExceeded {
            section_id: section_id.to_string(),
        },
        other => other,
    }
}

#[async_trait]
impl ClassSectionRepository for LibsqlTx {
    async fn load_section(&self, id: &str) -> Result<Option<ClassSection>, StoreError> {
        Ok(load_section_on(self.conn(), id).await?)
    }

    async fn insert_section(&self, section: &ClassSection) -> Result<(), StoreError> {
        self.insert_section_db(section)
            .await
            .map_err(|e| with_section_id(e.into(), section.id()))
    }

    async fn save_section(&self, section: &ClassSection) -> Result<i64, StoreError> {
        if self.claim_version(section).await? == 0 {
            if !self.section_exists(section.id()).await? {
                return Err(StoreError::not_found("class_section", section.id()));
            }
            return Err(StoreError::VersionMismatch {
                entity: "class_section".to_string(),
                id: section.id().to_string(),
                expected: section.version(),
            });
        }
        self.write_roster(section)
            .await
            .map_err(|e| with_section_id(e.into(), section.id()))?;
        Ok(section.version() + 1)
    }
}

impl LibsqlStore {
    /// Load a section outside a transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or the stored roster is
    /// inconsistent.
    pub async fn find_section(&self, id: &str) -> Result<Option<ClassSection>, DatabaseError> {
        let session = self.db().session().await?;
        load_section_on(session.conn(), id).await
    }
}
