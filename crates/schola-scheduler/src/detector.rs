//! Conflict detection against persisted entries.

use std::collections::HashSet;

use schola_core::conflict::{ConflictReport, scan};
use schola_core::entities::ScheduleEntry;
use schola_core::ports::{ScheduleRepository, StoreError};

/// Fetches the entries that could collide with a candidate and scans them.
///
/// Must run inside the same unit of work as the write that follows, so the
/// answer still holds at commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    /// Check `candidate` against active entries of its period that share its
    /// teacher, room or section. `exclude` names the entry being edited.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a repository query fails.
    pub async fn check<R>(
        self,
        repo: &R,
        candidate: &ScheduleEntry,
        exclude: Option<&str>,
    ) -> Result<ConflictReport, StoreError>
    where
        R: ScheduleRepository + ?Sized,
    {
        let period = candidate.period();
        let mut existing = repo
            .find_active_by_teacher(candidate.teacher_id(), period)
            .await?;
        if let Some(room) = candidate.room() {
            existing.extend(repo.find_active_by_room(room, period).await?);
        }
        existing.extend(
            repo.find_active_by_section(candidate.section_id(), period)
                .await?,
        );

        let mut seen = HashSet::new();
        existing.retain(|e| seen.insert(e.id().to_string()));
        let report = scan(candidate, &existing, exclude);
        if report.has_conflict() {
            tracing::debug!(entry_id = candidate.id(), %report, "conflict detected");
        }
        Ok(report)
    }
}
