//! Scheduling commands: auto-schedule tasks and inspect free slots.

use chrono::{Datelike, NaiveDate, Utc};
use clap::Subcommand;
use novacal_core::scheduler::WindowSource;
use novacal_core::storage::schedule_db::ScheduleDb;
use novacal_core::{AutoScheduler, Config, FreeSlotFinder, Interval, SchedulerConfig, TaskRepository};

use super::{print_json, resolve_owner, CommandResult};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Place tasks into the first free slots before their deadlines
    Run {
        /// Task IDs to schedule
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show free slots of a day
    Free {
        /// UTC day to inspect (YYYY-MM-DD, default: today in UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: ScheduleAction, owner: Option<String>) -> CommandResult {
    let owner = resolve_owner(owner);
    let config = SchedulerConfig::try_from(&Config::load()?)?;
    let db = ScheduleDb::open()?;

    match action {
        ScheduleAction::Run { ids } => {
            let scheduler = AutoScheduler::with_config(&db, config);
            let outcome = scheduler.schedule(&owner, &ids)?;
            print_json(&outcome)?;
        }
        ScheduleAction::Free { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let window = match config.window_source {
                WindowSource::Fixed => config.window,
                WindowSource::WorkingHours => {
                    db.working_hours(&owner)?
                        .into_iter()
                        .find(|h| h.weekday == date.weekday())
                        .map_or(config.window, |h| h.window())
                }
            };
            let Some(window) = window.on(date) else {
                print_json::<[Interval]>(&[])?;
                return Ok(());
            };
            let busy: Vec<Interval> = db
                .find_overlapping(&owner, &window, &[])?
                .iter()
                .filter_map(|task| task.interval().ok())
                .collect();
            let slots = FreeSlotFinder::new()
                .with_min_slot(config.min_slot)
                .find_slots(window, &busy);
            print_json(&slots)?;
        }
    }
    Ok(())
}
