use schola_db::EntryFilter;
use schola_scheduler::ScheduleRequest;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::{AddArgs, ScheduleCommands};
use crate::commands::shared::{parse_period, parse_slot};
use crate::context::AppContext;
use crate::output::{entry_line, entry_table, output};

/// Handle `schola schedule`.
pub async fn handle(action: &ScheduleCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.scheduling;
    let entry = match action {
        ScheduleCommands::Add(args) => svc.schedule(&request(args)?).await?,
        ScheduleCommands::Cancel { id } => svc.cancel(id).await?,
        ScheduleCommands::Reactivate { id } => svc.reactivate(id).await?,
        ScheduleCommands::Teacher { id, teacher } => svc.change_teacher(id, teacher).await?,
        ScheduleCommands::Room { id, room } => svc.change_room(id, room.as_deref()).await?,
        ScheduleCommands::Move { id, slot } => {
            let (day, start, end) = parse_slot(slot)?;
            svc.change_slot(id, day, start, end).await?
        }
        ScheduleCommands::List {
            section,
            teacher,
            room,
            year,
            term,
            all,
            limit,
        } => {
            let period = match (year, term) {
                (Some(year), Some(term)) => Some(parse_period(*year, *term)?),
                _ => None,
            };
            let filter = EntryFilter {
                section_id: section.clone(),
                teacher_id: teacher.clone(),
                room: room.clone(),
                period,
                active_only: !*all,
                limit: *limit,
            };
            let entries = ctx.store.list_entries(&filter).await?;
            return output(&entries, flags, |v| entry_table(v));
        }
    };
    output(&entry, flags, entry_line)
}

fn request(args: &AddArgs) -> anyhow::Result<ScheduleRequest> {
    let (day, start, end) = parse_slot(&args.slot)?;
    Ok(ScheduleRequest {
        section_id: args.section.clone(),
        subject_id: args.subject.clone(),
        teacher_id: args.teacher.clone(),
        room: args.room.clone(),
        day,
        start,
        end,
        period: parse_period(args.year, args.term)?,
    })
}
