use clap::Subcommand;

/// Outbox commands.
#[derive(Clone, Debug, Subcommand)]
pub enum FactsCommands {
    /// Deliver pending facts to the JSONL sink.
    Relay {
        /// Sink directory, overrides `facts.jsonl_dir`
        #[arg(long)]
        dir: Option<String>,
        #[arg(long)]
        batch: Option<usize>,
    },
    /// List recorded facts.
    List {
        /// Fact kind, e.g. schedule_created
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        entity: Option<String>,
        #[arg(long)]
        section: Option<String>,
        /// Only facts not yet delivered
        #[arg(long)]
        pending: bool,
        #[arg(long)]
        limit: Option<u32>,
    },
}
