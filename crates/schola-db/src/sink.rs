//! JSONL fact sink.
//!
//! Appends delivered facts to per-day `{dir}/facts-YYYY-MM-DD.jsonl` files,
//! keyed by the day the fact occurred. Uses `serde_jsonlines::append_json_lines`
//! for per-line appends. Redelivered fact ids are skipped, so the relay's
//! at-least-once delivery yields each line once.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use schola_core::facts::StoredFact;
use schola_core::ports::{FactSubscriber, SubscriberError};
use tokio::sync::Mutex;

use crate::error::DatabaseError;

const NAME: &str = "jsonl";

pub struct JsonlFactSink {
    dir: PathBuf,
    /// Fact ids already written, per file. Loaded from disk on first touch.
    seen: Mutex<HashMap<PathBuf, HashSet<String>>>,
}

impl JsonlFactSink {
    /// Create a sink writing into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DatabaseError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            seen: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a fact lands in.
    #[must_use]
    pub fn path_for(&self, fact: &StoredFact) -> PathBuf {
        self.dir
            .join(format!("facts-{}.jsonl", fact.occurred_at.format("%Y-%m-%d")))
    }

    /// Read every fact stored in one file.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the file cannot be read or a line is not a
    /// valid fact.
    pub fn read_file(path: &Path) -> Result<Vec<StoredFact>, DatabaseError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let facts = serde_jsonlines::json_lines(path)?.collect::<Result<Vec<StoredFact>, _>>()?;
        Ok(facts)
    }

    fn append(path: &Path, fact: &StoredFact) -> Result<(), DatabaseError> {
        serde_jsonlines::append_json_lines(path, [fact])?;
        Ok(())
    }
}

#[async_trait]
impl FactSubscriber for JsonlFactSink {
    fn name(&self) -> &str {
        NAME
    }

    async fn deliver(&self, fact: &StoredFact) -> Result<(), SubscriberError> {
        let fail = |e: DatabaseError| SubscriberError {
            subscriber: NAME.to_string(),
            fact_id: fact.id.clone(),
            reason: e.to_string(),
        };
        let path = self.path_for(fact);
        let mut seen = self.seen.lock().await;
        if !seen.contains_key(&path) {
            let ids = Self::read_file(&path)
                .map_err(fail)?
                .into_iter()
                .map(|f| f.id)
                .collect();
            seen.insert(path.clone(), ids);
        }
        let ids = seen.entry(path.clone()).or_default();
        if ids.contains(&fact.id) {
            tracing::debug!(fact_id = %fact.id, "fact already in sink, skipping");
            return Ok(());
        }
        Self::append(&path, fact).map_err(fail)?;
        ids.insert(fact.id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use schola_core::enums::FactKind;
    use schola_core::facts::DomainEvent;

    fn fact(id: &str, seq: i64, day: u32) -> StoredFact {
        let at = Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap();
        StoredFact {
            id: id.into(),
            seq,
            kind: FactKind::ScheduleCancelled,
            entity_id: "sch-00000001".into(),
            section_id: "sec-00000001".into(),
            occurred_at: at,
            delivered_at: None,
            payload: DomainEvent::ScheduleCancelled {
                entry_id: "sch-00000001".into(),
                section_id: "sec-00000001".into(),
                at,
            },
        }
    }

    #[tokio::test]
    async fn writes_one_line_per_fact_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlFactSink::new(dir.path().join("facts")).unwrap();
        sink.deliver(&fact("fct-00000001", 1, 2)).await.unwrap();
        sink.deliver(&fact("fct-00000002", 2, 2)).await.unwrap();
        sink.deliver(&fact("fct-00000003", 3, 3)).await.unwrap();

        let day2 = JsonlFactSink::read_file(&sink.dir().join("facts-2026-03-02.jsonl")).unwrap();
        let day3 = JsonlFactSink::read_file(&sink.dir().join("facts-2026-03-03.jsonl")).unwrap();
        assert_eq!(day2.len(), 2);
        assert_eq!(day3.len(), 1);
        assert_eq!(day2[1], fact("fct-00000002", 2, 2));
    }

    #[tokio::test]
    async fn redelivery_is_idempotent_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let f = fact("fct-00000001", 1, 2);
        {
            let sink = JsonlFactSink::new(dir.path()).unwrap();
            sink.deliver(&f).await.unwrap();
            sink.deliver(&f).await.unwrap();
        }
        let sink = JsonlFactSink::new(dir.path()).unwrap();
        sink.deliver(&f).await.unwrap();

        let lines = JsonlFactSink::read_file(&sink.path_for(&f)).unwrap();
        assert_eq!(lines.len(), 1);
    }
}
