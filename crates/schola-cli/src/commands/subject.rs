use anyhow::Context;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::SubjectCommands;
use crate::context::AppContext;
use crate::output::{output, subject_line};

/// Handle `schola subject`.
pub async fn handle(action: &SubjectCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let subject = match action {
        SubjectCommands::Add { name, school } => ctx.subjects.create_subject(school, name).await?,
        SubjectCommands::Deactivate { id } => set_active(ctx, id, false).await?,
        SubjectCommands::Activate { id } => set_active(ctx, id, true).await?,
        SubjectCommands::List { school } => {
            let subjects = ctx.subject_cache.active_subjects(school).await?;
            return output(&subjects, flags, |list| {
                if list.is_empty() {
                    return String::from("(no subjects)");
                }
                list.iter().map(subject_line).collect::<Vec<_>>().join("\n")
            });
        }
    };
    output(&subject, flags, subject_line)
}

async fn set_active(
    ctx: &AppContext,
    id: &str,
    active: bool,
) -> anyhow::Result<schola_catalog::SubjectInfo> {
    ctx.subjects
        .set_subject_active(id, active)
        .await?
        .with_context(|| format!("subject {id} not found"))
}
