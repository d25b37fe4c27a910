use anyhow::Context;
use chrono::NaiveTime;
use schola_core::enums::{Shift, Term, Weekday};
use schola_core::period::AcademicPeriod;

use crate::cli::subcommands::SlotArgs;

pub fn parse_time(value: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("invalid time '{value}', expected HH:MM"))
}

pub fn parse_day(value: &str) -> anyhow::Result<Weekday> {
    Ok(value.parse::<Weekday>()?)
}

pub fn parse_shift(value: &str) -> anyhow::Result<Shift> {
    Ok(value.parse::<Shift>()?)
}

pub fn parse_period(year: i32, term: u8) -> anyhow::Result<AcademicPeriod> {
    Ok(AcademicPeriod::of(year, Term::from_number(i64::from(term))?))
}

/// Day, start and end of a slot, unvalidated beyond parsing.
pub fn parse_slot(args: &SlotArgs) -> anyhow::Result<(Weekday, NaiveTime, NaiveTime)> {
    Ok((parse_day(&args.day)?, parse_time(&args.start)?, parse_time(&args.end)?))
}
