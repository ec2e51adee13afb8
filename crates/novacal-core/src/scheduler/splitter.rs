//! Decomposition of a custom task into conflict-free blocks.
//!
//! Blocks are proposed back to back from `overall_start`. A proposal that
//! overlaps an existing commitment is dropped and the cursor jumps past the
//! conflict without consuming any of the remaining length. Running out of
//! room before `overall_due` truncates the split; it is not an error.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::OwnerLocks;
use crate::error::{Result, SchedulingError};
use crate::schedule::{validate_importance, CustomTask, Task};
use crate::storage::TaskRepository;
use crate::timeline::Interval;

/// Blocks chosen for a custom task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitOutcome {
    pub blocks: Vec<Interval>,
    /// Set when the blocks add up to less than the requested total
    pub truncated: bool,
}

impl SplitOutcome {
    pub fn total_minutes(&self) -> i64 {
        self.blocks.iter().map(Interval::duration_minutes).sum()
    }
}

/// Split `custom` into blocks that avoid `obstacles`.
///
/// Without splitting, a single block starting at `overall_start` is produced
/// and obstacles are not consulted.
///
/// # Errors
/// Returns the validation error of [`CustomTask::validate`].
pub fn split(custom: &CustomTask, obstacles: &[Interval]) -> Result<SplitOutcome, SchedulingError> {
    custom.validate()?;
    let window = custom.window()?;
    let total = minutes(custom.total_length_minutes, SchedulingError::InvalidDuration {
        minutes: custom.total_length_minutes,
    })?;

    if !custom.split_enabled {
        let end = window
            .start()
            .checked_add_signed(total)
            .map_or(window.end(), |end| end.min(window.end()));
        let block = Interval::new(window.start(), end)?;
        return Ok(SplitOutcome {
            truncated: block.duration() < total,
            blocks: vec![block],
        });
    }

    let block_len = minutes(
        custom.block_duration_minutes,
        SchedulingError::InvalidBlockDuration {
            minutes: custom.block_duration_minutes,
        },
    )?;

    let mut blocks = Vec::new();
    let mut remaining = total;
    let mut cursor = window.start();

    while remaining > Duration::zero() && cursor < window.end() {
        let step = block_len.min(remaining);
        let proposed_end = cursor
            .checked_add_signed(step)
            .map_or(window.end(), |end| end.min(window.end()));
        let Ok(proposed) = Interval::new(cursor, proposed_end) else {
            break;
        };

        let conflict_end = obstacles
            .iter()
            .filter(|o| o.overlaps(&proposed))
            .map(Interval::end)
            .max();

        match conflict_end {
            Some(end) => cursor = end,
            None => {
                remaining = remaining - proposed.duration();
                cursor = proposed.end();
                blocks.push(proposed);
            }
        }
    }

    Ok(SplitOutcome {
        blocks,
        truncated: remaining > Duration::zero(),
    })
}

fn minutes(value: i64, err: SchedulingError) -> Result<Duration, SchedulingError> {
    Duration::try_minutes(value).ok_or(err)
}

/// A persisted custom task with its generated child tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedCustomTask {
    pub custom_task: CustomTask,
    pub tasks: Vec<Task>,
    pub truncated: bool,
}

/// Creates custom tasks and their child blocks against a repository.
pub struct BlockSplitter<R> {
    repo: R,
    locks: Arc<OwnerLocks>,
}

impl<R: TaskRepository> BlockSplitter<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            locks: OwnerLocks::shared(),
        }
    }

    /// Share owner locks with an [`AutoScheduler`](super::AutoScheduler).
    pub fn with_locks(mut self, locks: Arc<OwnerLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Validate, split and persist `custom` with its child tasks.
    ///
    /// Validation happens before the repository is touched. The custom task
    /// and every child row are written in one transaction.
    pub fn create_custom_task(&self, custom: CustomTask) -> Result<CreatedCustomTask> {
        custom.validate()?;
        validate_importance(custom.importance)?;
        let owner_id = custom.owner_id.clone();
        self.locks.with_owner(&owner_id, || {
            self.repo.atomically(|| self.create_locked(custom))
        })
    }

    fn create_locked(&self, custom: CustomTask) -> Result<CreatedCustomTask> {
        let obstacles: Vec<Interval> = if custom.split_enabled {
            self.repo
                .find_overlapping(&custom.owner_id, &custom.window()?, &[])?
                .iter()
                .filter_map(|task| task.interval().ok())
                .collect()
        } else {
            Vec::new()
        };

        let outcome = split(&custom, &obstacles)?;
        if outcome.truncated {
            tracing::warn!(
                custom_task_id = %custom.id,
                requested = custom.total_length_minutes,
                placed = outcome.total_minutes(),
                "custom task truncated at overall_due"
            );
        }

        let tasks: Vec<Task> = outcome
            .blocks
            .iter()
            .enumerate()
            .map(|(i, block)| custom.child_task(*block, i + 1))
            .collect();

        self.repo.insert_custom_task(&custom, &tasks)?;
        tracing::info!(
            custom_task_id = %custom.id,
            blocks = tasks.len(),
            obstacles = obstacles.len(),
            "custom task created"
        );

        Ok(CreatedCustomTask {
            custom_task: custom,
            tasks,
            truncated: outcome.truncated,
        })
    }
}
