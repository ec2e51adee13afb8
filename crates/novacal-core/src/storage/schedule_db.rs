//! SQLite-based storage for tasks, custom tasks, and working hours.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc, Weekday};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::data_dir;
use super::migrations;
use super::TaskRepository;
use crate::error::{CoreError, DatabaseError, Result, SchedulingError};
use crate::schedule::{
    format_time_of_day, parse_time_of_day, validate_importance, CustomTask, Placement, Task,
    WorkingHours,
};
use crate::timeline::Interval;

/// Wait for a concurrent writer before reporting the database as locked.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const TASK_COLUMNS: &str = "id, owner_id, title, start_time, end_time, due_time, importance,
    description, links, files, parent_custom_task_id, created_at";

const CUSTOM_TASK_COLUMNS: &str = "id, owner_id, name, description, links, files,
    overall_start_time, overall_due_time, total_length_minutes, importance, split_enabled,
    block_duration_minutes, created_at";

// === Helper Functions ===

/// Format a timestamp for storage.
///
/// Fixed-width nanosecond RFC 3339 in UTC, so text comparison in SQL orders
/// the same way as the timestamps themselves.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a stored timestamp column
fn parse_datetime(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_datetime(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Format weekday for database storage
fn format_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn invalid_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

/// Build a Task from a database row
fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        start: parse_datetime(row, 3)?,
        end: parse_datetime(row, 4)?,
        due: parse_optional_datetime(row, 5)?,
        importance: row.get(6)?,
        description: row.get(7)?,
        links: row.get(8)?,
        files: row.get(9)?,
        parent_custom_task_id: row.get(10)?,
        created_at: parse_datetime(row, 11)?,
    })
}

/// Build a CustomTask from a database row
fn row_to_custom_task(row: &Row) -> rusqlite::Result<CustomTask> {
    Ok(CustomTask {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        links: row.get(4)?,
        files: row.get(5)?,
        overall_start: parse_datetime(row, 6)?,
        overall_due: parse_datetime(row, 7)?,
        total_length_minutes: row.get(8)?,
        importance: row.get(9)?,
        split_enabled: row.get(10)?,
        block_duration_minutes: row.get(11)?,
        created_at: parse_datetime(row, 12)?,
    })
}

fn row_to_working_hours(row: &Row) -> rusqlite::Result<WorkingHours> {
    let day: String = row.get(1)?;
    let start: String = row.get(2)?;
    let end: String = row.get(3)?;
    Ok(WorkingHours {
        owner_id: row.get(0)?,
        weekday: day
            .parse::<Weekday>()
            .map_err(|_| invalid_column(1, format!("unknown weekday '{day}'")))?,
        start: parse_time_of_day(&start)
            .ok_or_else(|| invalid_column(2, format!("invalid time '{start}'")))?,
        end: parse_time_of_day(&end)
            .ok_or_else(|| invalid_column(3, format!("invalid time '{end}'")))?,
    })
}

/// SQLite database for schedule storage.
///
/// Stores tasks, custom tasks and per-weekday working hours.
pub struct ScheduleDb {
    conn: Connection,
}

impl ScheduleDb {
    /// Open the schedule database at `<data_dir>/novacal.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("novacal.db");
        Self::open_at(&path)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// How long to wait for another connection's write lock before failing
    /// with [`DatabaseError::Locked`].
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// Run `f` inside `BEGIN IMMEDIATE`, committing on success and rolling
    /// back on any error.
    ///
    /// Inside an open transaction `f` simply joins it; the outermost call
    /// commits or rolls back.
    fn with_transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if !self.conn.is_autocommit() {
            return f();
        }
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK;") {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    fn insert_task_row(&self, task: &Task) -> Result<()> {
        task.validate()?;
        validate_importance(task.importance)?;
        self.conn.execute(
            "INSERT INTO tasks (id, owner_id, title, start_time, end_time, due_time, importance,
                                description, links, files, parent_custom_task_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                task.id,
                task.owner_id,
                task.title,
                format_datetime(task.start),
                format_datetime(task.end),
                task.due.map(format_datetime),
                task.importance,
                task.description,
                task.links,
                task.files,
                task.parent_custom_task_id,
                format_datetime(task.created_at),
            ],
        )?;
        Ok(())
    }

    // === Task CRUD ===

    /// Create a new task.
    pub fn create_task(&self, task: &Task) -> Result<()> {
        self.insert_task_row(task)
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_task)
            .optional()?)
    }

    /// List tasks of an owner ordered by start time.
    pub fn list_tasks(&self, owner_id: &str) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 ORDER BY start_time ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![owner_id], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Update every editable field of an existing task.
    pub fn update_task(&self, task: &Task) -> Result<()> {
        task.validate()?;
        validate_importance(task.importance)?;
        let updated = self.conn.execute(
            "UPDATE tasks SET title = ?2, start_time = ?3, end_time = ?4, due_time = ?5,
                              importance = ?6, description = ?7, links = ?8, files = ?9
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                format_datetime(task.start),
                format_datetime(task.end),
                task.due.map(format_datetime),
                task.importance,
                task.description,
                task.links,
                task.files,
            ],
        )?;
        if updated == 0 {
            return Err(SchedulingError::NotFound(task.id.clone()).into());
        }
        Ok(())
    }

    /// Delete a task. Siblings and the parent custom task are untouched.
    ///
    /// Returns whether a row was deleted.
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Child tasks generated for a custom task.
    pub fn list_child_tasks(&self, custom_task_id: &str) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE parent_custom_task_id = ?1
             ORDER BY start_time ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![custom_task_id], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    // === Custom task CRUD ===

    /// Get a custom task by ID.
    pub fn get_custom_task(&self, id: &str) -> Result<Option<CustomTask>> {
        let sql = format!("SELECT {CUSTOM_TASK_COLUMNS} FROM custom_tasks WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_custom_task)
            .optional()?)
    }

    /// List custom tasks of an owner.
    pub fn list_custom_tasks(&self, owner_id: &str) -> Result<Vec<CustomTask>> {
        let sql = format!(
            "SELECT {CUSTOM_TASK_COLUMNS} FROM custom_tasks WHERE owner_id = ?1
             ORDER BY overall_start_time ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let custom_tasks = stmt
            .query_map(params![owner_id], row_to_custom_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(custom_tasks)
    }

    /// Delete a custom task. Its child tasks are kept.
    pub fn delete_custom_task(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM custom_tasks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    // === Working hours ===

    /// Replace the working hours for each weekday present in `hours`.
    pub fn set_working_hours(&self, hours: &[WorkingHours]) -> Result<()> {
        self.with_transaction(|| {
            for entry in hours {
                self.conn.execute(
                    "INSERT INTO working_hours (owner_id, day, start_time, end_time)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(owner_id, day) DO UPDATE SET
                        start_time = excluded.start_time,
                        end_time = excluded.end_time",
                    params![
                        entry.owner_id,
                        format_weekday(entry.weekday),
                        format_time_of_day(entry.start),
                        format_time_of_day(entry.end),
                    ],
                )?;
            }
            Ok(())
        })
    }
}

impl TaskRepository for ScheduleDb {
    fn find_by_ids(&self, owner_id: &str, ids: &[String]) -> Result<Vec<Task>> {
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(task) = self.get_task(id)? {
                if task.owner_id == owner_id {
                    tasks.push(task);
                }
            }
        }
        Ok(tasks)
    }

    fn find_overlapping(
        &self,
        owner_id: &str,
        interval: &Interval,
        exclude_ids: &[String],
    ) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE owner_id = ?1 AND start_time < ?3 AND end_time > ?2
             ORDER BY start_time ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(
                params![
                    owner_id,
                    format_datetime(interval.start()),
                    format_datetime(interval.end())
                ],
                row_to_task,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks
            .into_iter()
            .filter(|t| !exclude_ids.contains(&t.id))
            .collect())
    }

    fn update_task_times(&self, placements: &[Placement]) -> Result<()> {
        self.with_transaction(|| {
            for placement in placements {
                placement.interval()?;
                let updated = self.conn.execute(
                    "UPDATE tasks SET start_time = ?2, end_time = ?3 WHERE id = ?1",
                    params![
                        placement.task_id,
                        format_datetime(placement.start),
                        format_datetime(placement.end),
                    ],
                )?;
                if updated == 0 {
                    return Err(CoreError::from(SchedulingError::NotFound(
                        placement.task_id.clone(),
                    )));
                }
            }
            Ok(())
        })
    }

    fn insert_custom_task(&self, custom_task: &CustomTask, tasks: &[Task]) -> Result<()> {
        self.with_transaction(|| {
            self.conn.execute(
                "INSERT INTO custom_tasks (id, owner_id, name, description, links, files,
                                           overall_start_time, overall_due_time,
                                           total_length_minutes, importance, split_enabled,
                                           block_duration_minutes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    custom_task.id,
                    custom_task.owner_id,
                    custom_task.name,
                    custom_task.description,
                    custom_task.links,
                    custom_task.files,
                    format_datetime(custom_task.overall_start),
                    format_datetime(custom_task.overall_due),
                    custom_task.total_length_minutes,
                    custom_task.importance,
                    custom_task.split_enabled,
                    custom_task.block_duration_minutes,
                    format_datetime(custom_task.created_at),
                ],
            )?;
            for task in tasks {
                self.insert_task_row(task)?;
            }
            Ok(())
        })
    }

    fn atomically<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.with_transaction(f)
    }

    fn working_hours(&self, owner_id: &str) -> Result<Vec<WorkingHours>> {
        let mut stmt = self.conn.prepare(
            "SELECT owner_id, day, start_time, end_time FROM working_hours WHERE owner_id = ?1",
        )?;
        let hours = stmt
            .query_map(params![owner_id], row_to_working_hours)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hours)
    }
}
