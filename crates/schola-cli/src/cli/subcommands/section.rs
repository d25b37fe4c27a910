use clap::Subcommand;

/// Section and roster commands.
#[derive(Clone, Debug, Subcommand)]
pub enum SectionCommands {
    /// Create an empty section.
    Create {
        name: String,
        #[arg(long)]
        capacity: i64,
        #[arg(long)]
        year: i32,
        /// morning, afternoon, evening or full_day
        #[arg(long, default_value = "full_day")]
        shift: String,
    },
    /// Show a section and its roster.
    Show { id: String },
    /// Enroll a student.
    Enroll { section: String, student: String },
    /// Remove a student from the roster.
    Unenroll { section: String, student: String },
    /// Change the capacity.
    Capacity { section: String, capacity: i64 },
    /// Reopen a section for scheduling and enrollment.
    Activate { id: String },
    /// Close a section.
    Deactivate { id: String },
}
