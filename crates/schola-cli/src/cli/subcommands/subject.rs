use clap::Subcommand;

/// Subject catalog commands.
#[derive(Clone, Debug, Subcommand)]
pub enum SubjectCommands {
    /// Register a subject.
    Add {
        name: String,
        #[arg(long)]
        school: String,
    },
    /// Mark a subject inactive; it can no longer be scheduled.
    Deactivate { id: String },
    /// Mark a subject active again.
    Activate { id: String },
    /// List the active subjects of a school.
    List {
        #[arg(long)]
        school: String,
    },
}
