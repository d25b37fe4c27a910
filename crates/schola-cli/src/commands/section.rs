use crate::cli::GlobalFlags;
use crate::cli::subcommands::SectionCommands;
use crate::commands::shared::parse_shift;
use crate::context::AppContext;
use crate::output::{output, section_text};

/// Handle `schola section`.
pub async fn handle(action: &SectionCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.enrollment;
    let section = match action {
        SectionCommands::Create {
            name,
            capacity,
            year,
            shift,
        } => {
            svc.create_section(name, *capacity, *year, parse_shift(shift)?)
                .await?
        }
        SectionCommands::Show { id } => svc.get_section(id).await?,
        SectionCommands::Enroll { section, student } => svc.enroll(section, student).await?,
        SectionCommands::Unenroll { section, student } => svc.unenroll(section, student).await?,
        SectionCommands::Capacity { section, capacity } => {
            svc.change_capacity(section, *capacity).await?
        }
        SectionCommands::Activate { id } => svc.activate(id).await?,
        SectionCommands::Deactivate { id } => svc.deactivate(id).await?,
    };
    output(&section, flags, section_text)
}
