//! Repository contract the scheduling engine reads from and writes to.
//!
//! # Invariants
//! - Every read is scoped to one owner; rows of other owners are never returned.
//! - Multi-row writes are all-or-nothing. A failed write leaves no partial rows.
//! - Reads and writes issued inside [`TaskRepository::atomically`] see no
//!   interleaved writer, also across processes sharing the same store.

use crate::error::Result;
use crate::schedule::{CustomTask, Placement, Task, WorkingHours};
use crate::timeline::Interval;

pub trait TaskRepository {
    /// Point lookup of tasks owned by `owner_id`. Unknown ids are skipped.
    fn find_by_ids(&self, owner_id: &str, ids: &[String]) -> Result<Vec<Task>>;

    /// Tasks of `owner_id` overlapping `interval`, minus `exclude_ids`.
    fn find_overlapping(
        &self,
        owner_id: &str,
        interval: &Interval,
        exclude_ids: &[String],
    ) -> Result<Vec<Task>>;

    /// Rewrite start/end of every placed task in one transaction.
    fn update_task_times(&self, placements: &[Placement]) -> Result<()>;

    /// Insert a custom task and its generated child rows in one transaction.
    fn insert_custom_task(&self, custom_task: &CustomTask, tasks: &[Task]) -> Result<()>;

    /// Per-weekday working hours of `owner_id`.
    fn working_hours(&self, owner_id: &str) -> Result<Vec<WorkingHours>>;

    /// Run `f` holding the store's write lock, committing only if it succeeds.
    ///
    /// Writes made by `f` through this repository join the same transaction.
    /// The default runs `f` directly, which suits stores only reachable from
    /// one process.
    fn atomically<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        f()
    }
}

impl<T: TaskRepository + ?Sized> TaskRepository for &T {
    fn find_by_ids(&self, owner_id: &str, ids: &[String]) -> Result<Vec<Task>> {
        (**self).find_by_ids(owner_id, ids)
    }

    fn find_overlapping(
        &self,
        owner_id: &str,
        interval: &Interval,
        exclude_ids: &[String],
    ) -> Result<Vec<Task>> {
        (**self).find_overlapping(owner_id, interval, exclude_ids)
    }

    fn update_task_times(&self, placements: &[Placement]) -> Result<()> {
        (**self).update_task_times(placements)
    }

    fn insert_custom_task(&self, custom_task: &CustomTask, tasks: &[Task]) -> Result<()> {
        (**self).insert_custom_task(custom_task, tasks)
    }

    fn working_hours(&self, owner_id: &str) -> Result<Vec<WorkingHours>> {
        (**self).working_hours(owner_id)
    }

    fn atomically<U>(&self, f: impl FnOnce() -> Result<U>) -> Result<U> {
        (**self).atomically(f)
    }
}
