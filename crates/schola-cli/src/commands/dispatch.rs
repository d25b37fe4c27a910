use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Section { action } => commands::section::handle(&action, ctx, flags).await,
        Commands::Schedule { action } => commands::schedule::handle(&action, ctx, flags).await,
        Commands::Subject { action } => commands::subject::handle(&action, ctx, flags).await,
        Commands::Facts { action } => commands::facts::handle(&action, ctx, flags).await,
    }
}
