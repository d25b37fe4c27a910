use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::GlobalFlags;
pub use root_commands::Commands;

/// Top-level CLI parser for the `schola` binary.
#[derive(Debug, Parser)]
#[command(name = "schola", version, about = "Schola - school timetable scheduling")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Database path, overrides `database.path` (use `:memory:` for a scratch run)
    #[arg(long, global = true)]
    pub db: Option<String>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            json: self.json,
            db: self.db.clone(),
        }
    }
}
