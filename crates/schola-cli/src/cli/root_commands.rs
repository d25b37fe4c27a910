use clap::Subcommand;

use super::subcommands::{FactsCommands, ScheduleCommands, SectionCommands, SubjectCommands};

/// Top-level commands.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Class sections and their rosters.
    Section {
        #[command(subcommand)]
        action: SectionCommands,
    },
    /// Timetable entries.
    Schedule {
        #[command(subcommand)]
        action: ScheduleCommands,
    },
    /// Subject catalog.
    Subject {
        #[command(subcommand)]
        action: SubjectCommands,
    },
    /// Outbox facts.
    Facts {
        #[command(subcommand)]
        action: FactsCommands,
    },
}
