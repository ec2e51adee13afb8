use chrono::Weekday;
use clap::Subcommand;
use novacal_core::schedule::{parse_time_of_day, WorkingHours};
use novacal_core::storage::schedule_db::ScheduleDb;
use novacal_core::TaskRepository;

use super::{print_json, resolve_owner, CommandResult};

#[derive(Subcommand)]
pub enum HoursAction {
    /// Set working hours for a weekday
    Set {
        /// Weekday (e.g. "mon", "Tuesday")
        day: String,
        /// Start time, HH:MM (UTC)
        start: String,
        /// End time, HH:MM (UTC)
        end: String,
    },
    /// List working hours
    List,
}

pub fn run(action: HoursAction, owner: Option<String>) -> CommandResult {
    let owner = resolve_owner(owner);
    let db = ScheduleDb::open()?;

    match action {
        HoursAction::Set { day, start, end } => {
            let weekday: Weekday = day
                .parse()
                .map_err(|_| format!("invalid weekday: {day}"))?;
            let parse = |value: &str| {
                parse_time_of_day(value).ok_or_else(|| format!("expected HH:MM, got '{value}'"))
            };
            let hours = WorkingHours {
                owner_id: owner,
                weekday,
                start: parse(&start)?,
                end: parse(&end)?,
            };
            db.set_working_hours(std::slice::from_ref(&hours))?;
            print_json(&hours)?;
        }
        HoursAction::List => {
            print_json(&db.working_hours(&owner)?)?;
        }
    }
    Ok(())
}
