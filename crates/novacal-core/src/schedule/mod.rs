//! Schedule types for tasks, custom tasks, and working hours.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{SchedulingError, ValidationError};
use crate::timeline::Interval;

/// Importance assigned when the caller does not give one.
pub const DEFAULT_IMPORTANCE: u8 = 2;

/// A calendar task owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Deadline. When absent, `end` is the deadline.
    pub due: Option<DateTime<Utc>>,
    /// Higher is more urgent.
    pub importance: u8,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub links: String,
    #[serde(default)]
    pub files: String,
    pub parent_custom_task_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task with a fresh id and empty metadata.
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            title: title.into(),
            start,
            end,
            due: None,
            importance: DEFAULT_IMPORTANCE,
            description: String::new(),
            links: String::new(),
            files: String::new(),
            parent_custom_task_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = importance;
        self
    }

    /// The due time if set, else the task's own end.
    pub fn effective_deadline(&self) -> DateTime<Utc> {
        self.due.unwrap_or(self.end)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The task's current `[start, end)` interval.
    pub fn interval(&self) -> Result<Interval, SchedulingError> {
        Interval::new(self.start, self.end)
    }

    /// Check the `start < end` invariant.
    pub fn validate(&self) -> Result<(), SchedulingError> {
        self.interval().map(|_| ())
    }
}

/// New start/end chosen for a task by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub task_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Placement {
    pub fn interval(&self) -> Result<Interval, SchedulingError> {
        Interval::new(self.start, self.end)
    }
}

/// A long task that is materialized as one or more child [`Task`] rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTask {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub links: String,
    #[serde(default)]
    pub files: String,
    pub overall_start: DateTime<Utc>,
    pub overall_due: DateTime<Utc>,
    pub total_length_minutes: i64,
    pub importance: u8,
    pub split_enabled: bool,
    pub block_duration_minutes: i64,
    pub created_at: DateTime<Utc>,
}

impl CustomTask {
    /// Validate the custom task before anything is written.
    ///
    /// # Errors
    /// - `InvalidInterval` when `overall_start >= overall_due`
    /// - `InvalidDuration` when `total_length_minutes <= 0`
    /// - `InvalidBlockDuration` when splitting with `block_duration_minutes <= 0`
    pub fn validate(&self) -> Result<(), SchedulingError> {
        self.window()?;
        if self.total_length_minutes <= 0 {
            return Err(SchedulingError::InvalidDuration {
                minutes: self.total_length_minutes,
            });
        }
        if self.split_enabled && self.block_duration_minutes <= 0 {
            return Err(SchedulingError::InvalidBlockDuration {
                minutes: self.block_duration_minutes,
            });
        }
        Ok(())
    }

    /// The `[overall_start, overall_due)` window blocks must fit in.
    pub fn window(&self) -> Result<Interval, SchedulingError> {
        Interval::new(self.overall_start, self.overall_due)
    }

    /// Build the child task row for one accepted block.
    ///
    /// `block_number` is 1-based and only shows up in the title when splitting.
    pub fn child_task(&self, block: Interval, block_number: usize) -> Task {
        let title = if self.split_enabled {
            format!("{} ({})", self.name, block_number)
        } else {
            self.name.clone()
        };
        Task {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: self.owner_id.clone(),
            title,
            start: block.start(),
            end: block.end(),
            due: Some(self.overall_due),
            importance: self.importance,
            description: self.description.clone(),
            links: self.links.clone(),
            files: self.files.clone(),
            parent_custom_task_id: Some(self.id.clone()),
            created_at: Utc::now(),
        }
    }
}

/// Daily `[start, end)` time-of-day window tasks may be placed in.
///
/// Times are UTC wall-clock times; the default 08:00 to 22:00 window is
/// 08:00Z to 22:00Z on every date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// The window on the UTC `date`, or `None` when it is empty.
    pub fn on(&self, date: NaiveDate) -> Option<Interval> {
        let start = date.and_time(self.start).and_utc();
        let end = date.and_time(self.end).and_utc();
        Interval::new(start, end).ok()
    }
}

impl Default for WorkingWindow {
    /// 08:00 to 22:00
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Per-owner working hours for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub owner_id: String,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingHours {
    pub fn window(&self) -> WorkingWindow {
        WorkingWindow::new(self.start, self.end)
    }
}

/// Importance must be at least 1.
pub fn validate_importance(importance: u8) -> Result<(), ValidationError> {
    if importance == 0 {
        return Err(ValidationError::InvalidValue {
            field: "importance".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Parse an `HH:MM` time of day.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Format a time of day as `HH:MM`.
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn custom(split: bool) -> CustomTask {
        CustomTask {
            id: "custom-1".to_string(),
            owner_id: "u1".to_string(),
            name: "Thesis".to_string(),
            description: "chapter 3".to_string(),
            links: String::new(),
            files: String::new(),
            overall_start: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
            overall_due: Utc.with_ymd_and_hms(2026, 3, 6, 17, 0, 0).unwrap(),
            total_length_minutes: 240,
            importance: 4,
            split_enabled: split,
            block_duration_minutes: 60,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn effective_deadline_falls_back_to_end() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let end = start + Duration::hours(1);
        let task = Task::new("u1", "Write", start, end);
        assert_eq!(task.effective_deadline(), end);

        let due = end + Duration::days(2);
        assert_eq!(task.with_due(due).effective_deadline(), due);
    }

    #[test]
    fn task_validate_rejects_inverted_interval() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let task = Task::new("u1", "Broken", start, start);
        assert!(matches!(
            task.validate(),
            Err(SchedulingError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn custom_task_validation_order() {
        let mut ct = custom(true);
        assert!(ct.validate().is_ok());

        ct.block_duration_minutes = 0;
        assert_eq!(
            ct.validate(),
            Err(SchedulingError::InvalidBlockDuration { minutes: 0 })
        );

        ct.split_enabled = false;
        assert!(ct.validate().is_ok());

        ct.total_length_minutes = -5;
        assert_eq!(
            ct.validate(),
            Err(SchedulingError::InvalidDuration { minutes: -5 })
        );

        ct.overall_due = ct.overall_start;
        assert!(matches!(
            ct.validate(),
            Err(SchedulingError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn child_task_copies_metadata_and_numbers_blocks() {
        let ct = custom(true);
        let block = Interval::starting_at(ct.overall_start, Duration::minutes(60)).unwrap();
        let child = ct.child_task(block, 3);
        assert_eq!(child.title, "Thesis (3)");
        assert_eq!(child.due, Some(ct.overall_due));
        assert_eq!(child.importance, 4);
        assert_eq!(child.description, "chapter 3");
        assert_eq!(child.parent_custom_task_id.as_deref(), Some("custom-1"));

        let single = custom(false).child_task(block, 1);
        assert_eq!(single.title, "Thesis");
    }

    #[test]
    fn working_window_on_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let window = WorkingWindow::default().on(date).unwrap();
        assert_eq!(window.start(), Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
        assert_eq!(window.end(), Utc.with_ymd_and_hms(2026, 3, 2, 22, 0, 0).unwrap());

        let inverted = WorkingWindow::new(
            parse_time_of_day("18:00").unwrap(),
            parse_time_of_day("09:00").unwrap(),
        );
        assert!(inverted.on(date).is_none());
    }

    #[test]
    fn zero_importance_is_rejected() {
        assert!(validate_importance(1).is_ok());
        assert!(validate_importance(0).is_err());
    }

    #[test]
    fn time_of_day_round_trip() {
        let t = parse_time_of_day("07:30").unwrap();
        assert_eq!(format_time_of_day(t), "07:30");
        assert!(parse_time_of_day("25:00").is_none());
        assert!(parse_time_of_day("noon").is_none());
    }

    #[test]
    fn task_serialization() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let task = Task::new("u1", "Test task", start, start + Duration::minutes(30));
        let json = serde_json::to_string(&task).unwrap();
        let decoded: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, task);
    }
}
