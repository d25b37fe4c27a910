mod facts;
mod schedule;
mod section;
mod subject;

pub use facts::FactsCommands;
pub use schedule::{AddArgs, ScheduleCommands, SlotArgs};
pub use section::SectionCommands;
pub use subject::SubjectCommands;
