//! Pure conflict scan.
//!
//! A candidate entry conflicts with an existing one when both are in the same
//! academic period, their slots overlap, the existing entry is active, and
//! they share a teacher, a (non-empty) room, or a class section. Capacity
//! plays no part. Storage access is layered on top by the scheduler crate.

use std::collections::BTreeSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::ScheduleEntry;
use crate::enums::ConflictKind;
use crate::facts::SlotDetail;

/// An existing entry that the candidate collides with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConflictRef {
    pub entry_id: String,
    pub slot: SlotDetail,
}

impl From<&ScheduleEntry> for ConflictRef {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            entry_id: entry.id().to_string(),
            slot: SlotDetail::from(entry.slot()),
        }
    }
}

/// Which resources are double-booked, and by which entries.
///
/// An empty report means no conflict. The storage backstop produces a report
/// that names the kind but carries no entry references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConflictReport {
    pub teacher: Vec<ConflictRef>,
    pub room: Vec<ConflictRef>,
    pub section: Vec<ConflictRef>,
    /// Kinds raised by the storage backstop rather than the scan.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub backstop: BTreeSet<ConflictKind>,
}

impl ConflictReport {
    #[must_use]
    pub fn from_backstop(kind: ConflictKind) -> Self {
        Self {
            backstop: BTreeSet::from([kind]),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn has_conflict(&self) -> bool {
        !self.kinds().is_empty()
    }

    /// Conflict kinds that fired, in `teacher, room, section` order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ConflictKind> {
        let mut kinds = BTreeSet::new();
        if !self.teacher.is_empty() {
            kinds.insert(ConflictKind::Teacher);
        }
        if !self.room.is_empty() {
            kinds.insert(ConflictKind::Room);
        }
        if !self.section.is_empty() {
            kinds.insert(ConflictKind::Section);
        }
        kinds.extend(self.backstop.iter().copied());
        kinds.into_iter().collect()
    }

    #[must_use]
    pub fn refs(&self, kind: ConflictKind) -> &[ConflictRef] {
        match kind {
            ConflictKind::Teacher => &self.teacher,
            ConflictKind::Room => &self.room,
            ConflictKind::Section => &self.section,
        }
    }

    fn push(&mut self, kind: ConflictKind, entry: &ScheduleEntry) {
        let list = match kind {
            ConflictKind::Teacher => &mut self.teacher,
            ConflictKind::Room => &mut self.room,
            ConflictKind::Section => &mut self.section,
        };
        if !list.iter().any(|r| r.entry_id == entry.id()) {
            list.push(ConflictRef::from(entry));
        }
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds = self.kinds();
        if kinds.is_empty() {
            return f.write_str("no conflict");
        }
        let mut first = true;
        for kind in kinds {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            let ids: Vec<&str> = self.refs(kind).iter().map(|r| r.entry_id.as_str()).collect();
            if ids.is_empty() {
                write!(f, "{kind} double-booked")?;
            } else {
                write!(f, "{kind} double-booked by {}", ids.join(", "))?;
            }
        }
        Ok(())
    }
}

/// Scan `existing` for entries that conflict with `candidate`.
///
/// Entries that are cancelled, belong to another period, carry the
/// candidate's own id, or match `exclude` are ignored.
#[must_use]
pub fn scan<'a>(
    candidate: &ScheduleEntry,
    existing: impl IntoIterator<Item = &'a ScheduleEntry>,
    exclude: Option<&str>,
) -> ConflictReport {
    let mut report = ConflictReport::default();
    for other in existing {
        if !other.is_active()
            || other.period() != candidate.period()
            || other.id() == candidate.id()
            || exclude == Some(other.id())
            || !candidate.slot().overlaps(other.slot())
        {
            continue;
        }
        if other.teacher_id() == candidate.teacher_id() {
            report.push(ConflictKind::Teacher, other);
        }
        if matches!((candidate.room(), other.room()), (Some(a), Some(b)) if a == b) {
            report.push(ConflictKind::Room, other);
        }
        if other.section_id() == candidate.section_id() {
            report.push(ConflictKind::Section, other);
        }
    }
    report
}
