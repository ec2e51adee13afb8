//! Automatic scheduling of tasks into free working time.
//!
//! This module provides:
//! - [`AutoScheduler`]: first-fit placement of a batch of tasks across days,
//!   ordered by deadline, importance and duration
//! - [`BlockSplitter`]: decomposition of a custom task into fixed-length
//!   blocks that avoid existing commitments
//! - [`SchedulerConfig`]: working window source, day walk start and horizon ceiling

mod allocator;
mod lock;
mod ordering;
mod splitter;

pub use allocator::{AutoScheduler, ScheduleOutcome};
pub use lock::OwnerLocks;
pub use ordering::{compare_for_placement, order_for_placement};
pub use splitter::{split, BlockSplitter, CreatedCustomTask, SplitOutcome};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::schedule::{parse_time_of_day, WorkingWindow};
use crate::storage::Config;

/// Where the daily working window comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSource {
    /// The same window every day
    #[default]
    Fixed,
    /// The owner's per-weekday working hours; weekdays without a record use
    /// the fixed window
    WorkingHours,
}

/// First day the allocator tries for each task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayWalkStart {
    /// The day the scheduler runs, even for tasks that start later
    #[default]
    Today,
    /// The later of today and the task's own start date
    TaskStart,
}

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Fixed working window, also the fallback for weekdays without hours
    pub window: WorkingWindow,
    pub window_source: WindowSource,
    pub day_walk_start: DayWalkStart,
    /// Maximum number of days walked for a single task
    pub max_horizon_days: u32,
    /// Free slots shorter than this are ignored
    pub min_slot: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window: WorkingWindow::default(),
            window_source: WindowSource::Fixed,
            day_walk_start: DayWalkStart::Today,
            max_horizon_days: 366,
            min_slot: Duration::zero(),
        }
    }
}

impl TryFrom<&Config> for SchedulerConfig {
    type Error = ConfigError;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        let section = &config.scheduler;
        let parse = |key: &str, value: &str| {
            parse_time_of_day(value).ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected HH:MM, got '{value}'"),
            })
        };
        let start = parse("scheduler.day_start", &section.day_start)?;
        let end = parse("scheduler.day_end", &section.day_end)?;
        if start >= end {
            return Err(ConfigError::InvalidValue {
                key: "scheduler.day_start".to_string(),
                message: format!(
                    "day_start ({}) must be before day_end ({})",
                    section.day_start, section.day_end
                ),
            });
        }
        if section.max_horizon_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scheduler.max_horizon_days".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            window: WorkingWindow::new(start, end),
            window_source: section.window_source,
            day_walk_start: section.day_walk_start,
            max_horizon_days: section.max_horizon_days,
            min_slot: Duration::minutes(i64::from(section.min_slot_minutes)),
        })
    }
}
