//! # schola-scheduler
//!
//! Application services for timetable scheduling and class rosters.
//!
//! - [`SchedulingService`] creates and edits schedule entries. The subject is
//!   confirmed through the lookup cache before any transaction opens; the
//!   conflict scan and the write then share one unit of work.
//! - [`EnrollmentService`] manages sections and rosters under optimistic
//!   version checks.
//! - [`FactRelay`] moves committed facts from the outbox to subscribers.
//!
//! All services are generic over the storage ports in `schola_core::ports`.

pub mod detector;
pub mod enrollment;
pub mod error;
pub mod relay;
mod retry;
pub mod scheduling;

pub use detector::ConflictDetector;
pub use enrollment::{EnrollmentService, SectionChange};
pub use error::SchedulingError;
pub use relay::{FactRelay, RelayReport};
pub use scheduling::{EntryChange, ScheduleRequest, SchedulingService};

use schola_core::ports::UnitOfWork;

/// Roll back after a failed attempt and hand back the original error.
pub(crate) async fn abandon<T: UnitOfWork>(tx: T, cause: SchedulingError) -> SchedulingError {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, cause = %cause, "rollback failed");
    }
    cause
}
