use std::fmt::Write as _;

use schola_catalog::SubjectInfo;
use schola_core::entities::{ClassSection, ScheduleEntry};
use schola_core::facts::StoredFact;
use serde::Serialize;

use crate::cli::GlobalFlags;

/// Print `value` as pretty JSON under `--json`, otherwise the text rendering.
pub fn output<T: Serialize>(
    value: &T,
    flags: &GlobalFlags,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    if flags.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

pub fn entry_line(entry: &ScheduleEntry) -> String {
    format!(
        "{}  {}  {}  section={} subject={} teacher={} room={} [{}]",
        entry.id(),
        entry.period(),
        entry.slot(),
        entry.section_id(),
        entry.subject_id(),
        entry.teacher_id(),
        entry.room().unwrap_or("-"),
        entry.status()
    )
}

pub fn entry_table(entries: &[ScheduleEntry]) -> String {
    if entries.is_empty() {
        return String::from("(no entries)");
    }
    entries.iter().map(entry_line).collect::<Vec<_>>().join("\n")
}

pub fn section_text(section: &ClassSection) -> String {
    let mut out = format!(
        "{}  {} ({}, {})  {}/{} enrolled  version {}{}",
        section.id(),
        section.name(),
        section.year(),
        section.shift(),
        section.enrolled_count(),
        section.capacity(),
        section.version(),
        if section.is_active() { "" } else { "  [inactive]" }
    );
    for student in section.enrolled_students() {
        let _ = write!(out, "\n  {student}");
    }
    out
}

pub fn subject_line(subject: &SubjectInfo) -> String {
    format!(
        "{}  {}  school={}{}",
        subject.id,
        subject.name,
        subject.school_id,
        if subject.active { "" } else { "  [inactive]" }
    )
}

pub fn fact_line(fact: &StoredFact) -> String {
    let delivered = fact
        .delivered_at
        .map_or_else(|| String::from("pending"), |at| at.to_rfc3339());
    format!(
        "#{} {}  {}  entity={} section={}  {}",
        fact.seq, fact.id, fact.kind, fact.entity_id, fact.section_id, delivered
    )
}
