//! In-memory task repository (non-persistent).
//!
//! Used by tests and by callers that want to run the engine over data they
//! already hold. Writes validate every row before touching state, so a failed
//! batch leaves nothing behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{DatabaseError, Result, SchedulingError};
use crate::schedule::{CustomTask, Placement, Task, WorkingHours};
use crate::storage::TaskRepository;
use crate::timeline::Interval;

#[derive(Default)]
struct State {
    tasks: Vec<Task>,
    custom_tasks: Vec<CustomTask>,
    working_hours: Vec<WorkingHours>,
}

#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
    fail_writes: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository with existing tasks, validating each one.
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Result<Self> {
        let repo = Self::new();
        for task in tasks {
            repo.insert_task(task)?;
        }
        Ok(repo)
    }

    /// Make every following write fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn insert_task(&self, task: Task) -> Result<()> {
        task.validate()?;
        self.write()?.tasks.push(task);
        Ok(())
    }

    pub fn set_working_hours(&self, hours: WorkingHours) -> Result<()> {
        let mut state = self.write()?;
        state
            .working_hours
            .retain(|h| !(h.owner_id == hours.owner_id && h.weekday == hours.weekday));
        state.working_hours.push(hours);
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.read()?.tasks.iter().find(|t| t.id == id).cloned())
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.read()?.tasks.clone())
    }

    pub fn list_custom_tasks(&self) -> Result<Vec<CustomTask>> {
        Ok(self.read()?.custom_tasks.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        Ok(self.state.read().map_err(|_| DatabaseError::Locked)?)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::QueryFailed("write rejected".to_string()).into());
        }
        Ok(self.state.write().map_err(|_| DatabaseError::Locked)?)
    }
}

impl TaskRepository for MemoryRepository {
    fn find_by_ids(&self, owner_id: &str, ids: &[String]) -> Result<Vec<Task>> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                state
                    .tasks
                    .iter()
                    .find(|t| &t.id == id && t.owner_id == owner_id)
                    .cloned()
            })
            .collect())
    }

    fn find_overlapping(
        &self,
        owner_id: &str,
        interval: &Interval,
        exclude_ids: &[String],
    ) -> Result<Vec<Task>> {
        let state = self.read()?;
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .filter(|t| !exclude_ids.contains(&t.id))
            .filter(|t| t.start < interval.end() && interval.start() < t.end)
            .cloned()
            .collect())
    }

    fn update_task_times(&self, placements: &[Placement]) -> Result<()> {
        let mut state = self.write()?;
        for placement in placements {
            placement.interval()?;
            if !state.tasks.iter().any(|t| t.id == placement.task_id) {
                return Err(SchedulingError::NotFound(placement.task_id.clone()).into());
            }
        }
        for placement in placements {
            if let Some(task) = state.tasks.iter_mut().find(|t| t.id == placement.task_id) {
                task.start = placement.start;
                task.end = placement.end;
            }
        }
        Ok(())
    }

    fn insert_custom_task(&self, custom_task: &CustomTask, tasks: &[Task]) -> Result<()> {
        let mut state = self.write()?;
        for task in tasks {
            task.validate()?;
        }
        state.custom_tasks.push(custom_task.clone());
        state.tasks.extend(tasks.iter().cloned());
        Ok(())
    }

    fn working_hours(&self, owner_id: &str) -> Result<Vec<WorkingHours>> {
        Ok(self
            .read()?
            .working_hours
            .iter()
            .filter(|h| h.owner_id == owner_id)
            .cloned()
            .collect())
    }
}
