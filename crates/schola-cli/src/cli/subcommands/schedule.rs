use clap::{Args, Subcommand};

/// Day and time range of a slot.
#[derive(Clone, Debug, Args)]
pub struct SlotArgs {
    /// Day of week (mon..sat)
    #[arg(long)]
    pub day: String,
    /// Start time, HH:MM
    #[arg(long)]
    pub start: String,
    /// End time, HH:MM
    #[arg(long)]
    pub end: String,
}

#[derive(Clone, Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub section: String,
    #[arg(long)]
    pub subject: String,
    #[arg(long)]
    pub teacher: String,
    #[arg(long)]
    pub room: Option<String>,
    #[command(flatten)]
    pub slot: SlotArgs,
    #[arg(long)]
    pub year: i32,
    /// Term number, 1-4
    #[arg(long)]
    pub term: u8,
}

/// Timetable entry commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ScheduleCommands {
    /// Schedule a class.
    Add(AddArgs),
    /// Cancel an entry.
    Cancel { id: String },
    /// Reactivate a cancelled entry.
    Reactivate { id: String },
    /// Assign another teacher.
    Teacher { id: String, teacher: String },
    /// Move to another room; omit the room to clear it.
    Room { id: String, room: Option<String> },
    /// Move to another slot.
    Move {
        id: String,
        #[command(flatten)]
        slot: SlotArgs,
    },
    /// List entries.
    List {
        #[arg(long)]
        section: Option<String>,
        #[arg(long)]
        teacher: Option<String>,
        #[arg(long)]
        room: Option<String>,
        #[arg(long, requires = "term")]
        year: Option<i32>,
        #[arg(long, requires = "year")]
        term: Option<u8>,
        /// Include cancelled entries
        #[arg(long)]
        all: bool,
        #[arg(long)]
        limit: Option<u32>,
    },
}
