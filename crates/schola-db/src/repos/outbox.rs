//! Fact outbox repository.
//!
//! Facts are appended inside the writer's transaction, so they become visible
//! exactly when the state change commits. `seq` is an AUTOINCREMENT key and
//! never reused, which gives the relay a stable delivery order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schola_core::enums::FactKind;
use schola_core::facts::{DomainEvent, StoredFact};
use schola_core::ids::PREFIX_FACT;
use schola_core::ports::{FactOutbox, StoreError};

use crate::error::DatabaseError;
use crate::generate_id_on;
use crate::helpers::{parse_datetime, parse_enum, parse_optional_datetime};
use crate::store::{LibsqlStore, LibsqlTx};

const SELECT_COLS: &str = "id, seq, kind, entity_id, section_id, occurred_at, delivered_at, payload";

/// Filter criteria for outbox queries.
#[derive(Debug, Default)]
pub struct FactFilter {
    pub kind: Option<FactKind>,
    pub entity_id: Option<String>,
    pub section_id: Option<String>,
    pub undelivered_only: bool,
    pub limit: Option<u32>,
}

fn row_to_fact(row: &libsql::Row) -> Result<StoredFact, DatabaseError> {
    let delivered = row.get::<Option<String>>(6)?;
    Ok(StoredFact {
        id: row.get::<String>(0)?,
        seq: row.get::<i64>(1)?,
        kind: parse_enum(&row.get::<String>(2)?)?,
        entity_id: row.get::<String>(3)?,
        section_id: row.get::<String>(4)?,
        occurred_at: parse_datetime(&row.get::<String>(5)?)?,
        delivered_at: parse_optional_datetime(delivered.as_deref())?,
        payload: serde_json::from_str(&row.get::<String>(7)?)?,
    })
}

#[async_trait]
impl FactOutbox for LibsqlTx {
    async fn append_facts(&self, events: &[DomainEvent]) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::with_capacity(events.len());
        for event in events {
            let id = generate_id_on(self.conn(), PREFIX_FACT).await?;
            let payload = serde_json::to_string(event).map_err(DatabaseError::from)?;
            self.conn()
                .execute(
                    "INSERT INTO fact_outbox (id, kind, entity_id, section_id, occurred_at, payload)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    libsql::params![
                        id.as_str(),
                        event.kind().as_str(),
                        event.entity_id(),
                        event.section_id(),
                        event.occurred_at().to_rfc3339(),
                        payload
                    ],
                )
                .await
                .map_err(DatabaseError::from)?;
            ids.push(id);
        }
        Ok(ids)
    }
}

impl LibsqlStore {
    pub(crate) async fn pending_facts_db(&self, limit: usize) -> Result<Vec<StoredFact>, DatabaseError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let session = self.db().session().await?;
        let mut rows = session
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM fact_outbox
                     WHERE delivered_at IS NULL ORDER BY seq LIMIT ?1"
                ),
                [limit],
            )
            .await?;
        let mut facts = Vec::new();
        while let Some(row) = rows.next().await? {
            facts.push(row_to_fact(&row)?);
        }
        Ok(facts)
    }

    pub(crate) async fn mark_delivered_db(
        &self,
        fact_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let session = self.db().session().await?;
        session
            .conn()
            .execute(
                "UPDATE fact_outbox SET delivered_at = ?2 WHERE id = ?1 AND delivered_at IS NULL",
                libsql::params![fact_id, at.to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /// Query outbox facts with optional filters, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a payload is unreadable.
    pub async fn query_facts(&self, filter: &FactFilter) -> Result<Vec<StoredFact>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(kind) = filter.kind {
            params.push(libsql::Value::Text(kind.as_str().to_string()));
            conditions.push(format!("kind = ?{}", params.len()));
        }
        if let Some(ref eid) = filter.entity_id {
            params.push(libsql::Value::Text(eid.clone()));
            conditions.push(format!("entity_id = ?{}", params.len()));
        }
        if let Some(ref sid) = filter.section_id {
            params.push(libsql::Value::Text(sid.clone()));
            conditions.push(format!("section_id = ?{}", params.len()));
        }
        if filter.undelivered_only {
            conditions.push("delivered_at IS NULL".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit = filter.limit.unwrap_or(100);
        let sql = format!("SELECT {SELECT_COLS} FROM fact_outbox {where_clause} ORDER BY seq LIMIT {limit}");

        let session = self.db().session().await?;
        let mut rows = session
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut facts = Vec::new();
        while let Some(row) = rows.next().await? {
            facts.push(row_to_fact(&row)?);
        }
        Ok(facts)
    }
}
