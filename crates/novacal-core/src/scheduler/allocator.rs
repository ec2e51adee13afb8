//! First-fit placement of a batch of tasks into free working time.
//!
//! Targets are ordered by deadline, importance and duration, then each one is
//! placed into the first free slot, day by day, that is long enough to hold
//! it. Placements made earlier in the batch count as obstacles for later
//! targets. Nothing is written until every target has been tried, and the
//! writes happen in one transaction.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::{order_for_placement, DayWalkStart, OwnerLocks, SchedulerConfig, WindowSource};
use crate::error::{Result, SchedulingError};
use crate::schedule::{Placement, Task, WorkingWindow};
use crate::storage::TaskRepository;
use crate::timeline::{FreeSlotFinder, Interval};

/// Result of one scheduling run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    /// Tasks with their new interval, in placement order
    pub placed: Vec<Placement>,
    /// Tasks that did not fit anywhere before their deadline
    pub unplaced: Vec<String>,
}

/// Automatic scheduler for a batch of tasks
pub struct AutoScheduler<R> {
    repo: R,
    config: SchedulerConfig,
    locks: Arc<OwnerLocks>,
}

impl<R: TaskRepository> AutoScheduler<R> {
    /// Create a new scheduler with default config
    pub fn new(repo: R) -> Self {
        Self::with_config(repo, SchedulerConfig::default())
    }

    /// Create with custom config
    pub fn with_config(repo: R, config: SchedulerConfig) -> Self {
        Self {
            repo,
            config,
            locks: OwnerLocks::shared(),
        }
    }

    /// Share owner locks with other schedulers or splitters.
    pub fn with_locks(mut self, locks: Arc<OwnerLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Schedule `task_ids` of `owner_id`, walking days from now.
    pub fn schedule(&self, owner_id: &str, task_ids: &[String]) -> Result<ScheduleOutcome> {
        self.schedule_at(owner_id, task_ids, Utc::now())
    }

    /// Schedule `task_ids` of `owner_id` as if the current time were `now`.
    ///
    /// # Errors
    /// - `NoMatchingTasks` when no id resolves to a task owned by `owner_id`
    /// - `InvalidInterval` when a target's stored interval is empty
    /// - a storage error when loading or committing fails; no placement is
    ///   committed in that case
    pub fn schedule_at(
        &self,
        owner_id: &str,
        task_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<ScheduleOutcome> {
        if task_ids.is_empty() {
            return Err(no_matching(owner_id));
        }
        self.locks.with_owner(owner_id, || {
            self.repo
                .atomically(|| self.schedule_locked(owner_id, task_ids, now))
        })
    }

    fn schedule_locked(
        &self,
        owner_id: &str,
        task_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<ScheduleOutcome> {
        let mut targets = self.load_targets(owner_id, task_ids)?;
        let today = now.date_naive();
        let horizon = horizon(&targets, today)?;
        let target_ids: Vec<String> = targets.iter().map(|t| t.id.clone()).collect();

        let mut obstacles: Vec<Interval> = self
            .repo
            .find_overlapping(owner_id, &horizon, &target_ids)?
            .iter()
            .filter_map(|task| match task.interval() {
                Ok(interval) => Some(interval),
                Err(err) => {
                    tracing::warn!(task_id = %task.id, error = %err, "skipping malformed obstacle");
                    None
                }
            })
            .collect();

        let weekly_hours = self.weekly_hours(owner_id)?;
        tracing::debug!(
            owner_id,
            targets = targets.len(),
            obstacles = obstacles.len(),
            horizon_start = %horizon.start(),
            horizon_end = %horizon.end(),
            "auto-schedule loaded"
        );

        order_for_placement(&mut targets);

        let finder = FreeSlotFinder::new().with_min_slot(self.config.min_slot);
        let mut outcome = ScheduleOutcome::default();

        for target in &targets {
            match self.place(target, today, &obstacles, &weekly_hours, &finder) {
                Some(interval) => {
                    tracing::debug!(
                        task_id = %target.id,
                        start = %interval.start(),
                        end = %interval.end(),
                        "task placed"
                    );
                    obstacles.push(interval);
                    outcome.placed.push(Placement {
                        task_id: target.id.clone(),
                        start: interval.start(),
                        end: interval.end(),
                    });
                }
                None => {
                    tracing::warn!(
                        task_id = %target.id,
                        deadline = %target.effective_deadline(),
                        "no free slot before deadline"
                    );
                    outcome.unplaced.push(target.id.clone());
                }
            }
        }

        if !outcome.placed.is_empty() {
            self.repo.update_task_times(&outcome.placed)?;
        }

        tracing::info!(
            owner_id,
            placed = outcome.placed.len(),
            unplaced = outcome.unplaced.len(),
            "auto-schedule finished"
        );
        Ok(outcome)
    }

    /// Load and validate the targets, dropping repeated ids.
    fn load_targets(&self, owner_id: &str, task_ids: &[String]) -> Result<Vec<Task>> {
        let mut seen = HashSet::new();
        let targets: Vec<Task> = self
            .repo
            .find_by_ids(owner_id, task_ids)?
            .into_iter()
            .filter(|t| seen.insert(t.id.clone()))
            .collect();

        if targets.is_empty() {
            return Err(no_matching(owner_id));
        }
        for target in &targets {
            target.validate()?;
        }
        Ok(targets)
    }

    fn weekly_hours(&self, owner_id: &str) -> Result<HashMap<Weekday, WorkingWindow>> {
        match self.config.window_source {
            WindowSource::Fixed => Ok(HashMap::new()),
            WindowSource::WorkingHours => Ok(self
                .repo
                .working_hours(owner_id)?
                .into_iter()
                .map(|h| (h.weekday, h.window()))
                .collect()),
        }
    }

    fn window_on(
        &self,
        day: NaiveDate,
        weekly_hours: &HashMap<Weekday, WorkingWindow>,
    ) -> Option<Interval> {
        weekly_hours
            .get(&day.weekday())
            .copied()
            .unwrap_or(self.config.window)
            .on(day)
    }

    /// Find the first slot, day by day, that fits `target`.
    fn place(
        &self,
        target: &Task,
        today: NaiveDate,
        obstacles: &[Interval],
        weekly_hours: &HashMap<Weekday, WorkingWindow>,
        finder: &FreeSlotFinder,
    ) -> Option<Interval> {
        let duration = target.duration();
        let last_day = target.effective_deadline().date_naive();
        let mut day = match self.config.day_walk_start {
            DayWalkStart::Today => today,
            DayWalkStart::TaskStart => today.max(target.start.date_naive()),
        };

        for _ in 0..self.config.max_horizon_days {
            if day > last_day {
                break;
            }
            if let Some(window) = self.window_on(day, weekly_hours) {
                let busy: Vec<Interval> = obstacles
                    .iter()
                    .filter(|o| o.overlaps(&window))
                    .copied()
                    .collect();
                let slot = finder
                    .find_slots(window, &busy)
                    .into_iter()
                    .find(|slot| slot.can_fit(duration));
                if let Some(slot) = slot {
                    return Interval::starting_at(slot.start(), duration).ok();
                }
            }
            day = day.succ_opt()?;
        }
        None
    }
}

fn no_matching(owner_id: &str) -> crate::error::CoreError {
    SchedulingError::NoMatchingTasks {
        owner_id: owner_id.to_string(),
    }
    .into()
}

/// Whole UTC days from the earliest target start (or today, if earlier)
/// through the latest effective deadline.
fn horizon(targets: &[Task], today: NaiveDate) -> Result<Interval> {
    let first_day = targets
        .iter()
        .map(|t| t.start.date_naive())
        .min()
        .map_or(today, |d| d.min(today));
    let last_day = targets
        .iter()
        .map(|t| t.effective_deadline().date_naive())
        .max()
        .map_or(first_day, |d| d.max(first_day));
    let end_day = last_day.succ_opt().unwrap_or(last_day);

    Ok(Interval::new(
        first_day.and_time(chrono::NaiveTime::MIN).and_utc(),
        end_day.and_time(chrono::NaiveTime::MIN).and_utc(),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schedule::WorkingHours;
    use crate::storage::MemoryRepository;
    use chrono::{Duration, NaiveTime, TimeZone};

    // Monday
    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
    }

    fn make_test_task(id: &str, importance: u8, minutes: i64, due: DateTime<Utc>) -> Task {
        let start = at(2, 6, 0);
        let mut task = Task::new("u1", id, start, start + Duration::minutes(minutes))
            .with_due(due)
            .with_importance(importance);
        task.id = id.to_string();
        task
    }

    fn obstacle(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Task {
        let mut task = Task::new("u1", id, start, end);
        task.id = id.to_string();
        task
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn now() -> DateTime<Utc> {
        at(2, 7, 0)
    }

    #[test]
    fn higher_importance_goes_first_on_shared_deadline() {
        let repo = MemoryRepository::with_tasks([
            make_test_task("b", 2, 30, at(2, 23, 0)),
            make_test_task("a", 5, 60, at(2, 23, 0)),
        ]).unwrap();
        let scheduler = AutoScheduler::new(&repo);

        let outcome = scheduler.schedule_at("u1", &ids(&["b", "a"]), now()).unwrap();

        assert_eq!(
            outcome.placed,
            vec![
                Placement { task_id: "a".into(), start: at(2, 8, 0), end: at(2, 9, 0) },
                Placement { task_id: "b".into(), start: at(2, 9, 0), end: at(2, 9, 30) },
            ]
        );
        assert!(outcome.unplaced.is_empty());

        let stored = repo.get_task("b").unwrap().unwrap();
        assert_eq!((stored.start, stored.end), (at(2, 9, 0), at(2, 9, 30)));
    }

    #[test]
    fn tied_tasks_are_placed_in_input_order_on_every_run() {
        let run = || {
            let repo = MemoryRepository::with_tasks(
                ["a", "b", "c"].map(|id| make_test_task(id, 3, 30, at(2, 23, 0))),
            )
            .unwrap();
            AutoScheduler::new(&repo)
                .schedule_at("u1", &ids(&["c", "a", "b"]), now())
                .unwrap()
        };

        let first = run();
        assert_eq!(first, run());
        assert_eq!(
            first.placed,
            vec![
                Placement { task_id: "c".into(), start: at(2, 8, 0), end: at(2, 8, 30) },
                Placement { task_id: "a".into(), start: at(2, 8, 30), end: at(2, 9, 0) },
                Placement { task_id: "b".into(), start: at(2, 9, 0), end: at(2, 9, 30) },
            ]
        );
    }

    #[test]
    fn first_fit_skips_slots_that_are_too_short() {
        let repo = MemoryRepository::with_tasks([
            make_test_task("t", 3, 90, at(2, 23, 0)),
            obstacle("standup", at(2, 9, 0), at(2, 10, 0)),
            obstacle("lunch", at(2, 11, 0), at(2, 12, 0)),
        ]).unwrap();
        let scheduler = AutoScheduler::new(&repo);

        let outcome = scheduler.schedule_at("u1", &ids(&["t"]), now()).unwrap();
        assert_eq!(outcome.placed[0].start, at(2, 12, 0));
        assert_eq!(outcome.placed[0].end, at(2, 13, 30));
    }

    #[test]
    fn full_day_moves_task_to_next_day() {
        let repo = MemoryRepository::with_tasks([
            make_test_task("t", 3, 60, at(4, 12, 0)),
            obstacle("offsite", at(2, 8, 0), at(2, 22, 0)),
        ]).unwrap();
        let scheduler = AutoScheduler::new(&repo);

        let outcome = scheduler.schedule_at("u1", &ids(&["t"]), now()).unwrap();
        assert_eq!(outcome.placed[0].start, at(3, 8, 0));
    }

    #[test]
    fn task_without_room_before_deadline_is_unplaced_not_an_error() {
        let repo = MemoryRepository::with_tasks([
            make_test_task("fits", 5, 600, at(2, 23, 0)),
            make_test_task("too-late", 1, 300, at(2, 23, 0)),
        ]).unwrap();
        let scheduler = AutoScheduler::new(&repo);

        let outcome = scheduler
            .schedule_at("u1", &ids(&["fits", "too-late"]), now())
            .unwrap();
        assert_eq!(outcome.placed.len(), 1);
        assert_eq!(outcome.unplaced, vec!["too-late".to_string()]);

        // The unplaced task keeps its old interval.
        let untouched = repo.get_task("too-late").unwrap().unwrap();
        assert_eq!(untouched.start, at(2, 6, 0));
    }

    #[test]
    fn deadline_in_the_past_is_unplaced() {
        let repo = MemoryRepository::with_tasks([make_test_task("old", 3, 30, at(1, 12, 0))]).unwrap();
        let scheduler = AutoScheduler::new(&repo);
        let outcome = scheduler.schedule_at("u1", &ids(&["old"]), now()).unwrap();
        assert!(outcome.placed.is_empty());
        assert_eq!(outcome.unplaced, vec!["old".to_string()]);
    }

    #[test]
    fn unknown_or_foreign_ids_fail_with_not_found() {
        let mut foreign = make_test_task("theirs", 3, 30, at(2, 23, 0));
        foreign.owner_id = "u2".to_string();
        let repo = MemoryRepository::with_tasks([foreign]).unwrap();
        let scheduler = AutoScheduler::new(&repo);

        let err = scheduler
            .schedule_at("u1", &ids(&["theirs", "ghost"]), now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = scheduler.schedule_at("u1", &[], now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn failed_commit_leaves_tasks_untouched() {
        let repo = MemoryRepository::with_tasks([
            make_test_task("a", 3, 30, at(2, 23, 0)),
            make_test_task("b", 3, 30, at(2, 23, 0)),
        ]).unwrap();
        repo.fail_writes(true);
        let scheduler = AutoScheduler::new(&repo);

        let err = scheduler.schedule_at("u1", &ids(&["a", "b"]), now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);

        repo.fail_writes(false);
        for id in ["a", "b"] {
            assert_eq!(repo.get_task(id).unwrap().unwrap().start, at(2, 6, 0));
        }
    }

    #[test]
    fn day_walk_starts_today_even_for_future_tasks() {
        let mut future = make_test_task("future", 3, 60, at(6, 23, 0));
        future.start = at(5, 9, 0);
        future.end = at(5, 10, 0);
        let repo = MemoryRepository::with_tasks([future]).unwrap();

        let scheduler = AutoScheduler::new(&repo);
        let outcome = scheduler.schedule_at("u1", &ids(&["future"]), now()).unwrap();
        assert_eq!(outcome.placed[0].start, at(2, 8, 0));
    }

    #[test]
    fn task_start_walk_begins_on_the_task_start_date() {
        let mut future = make_test_task("future", 3, 60, at(6, 23, 0));
        future.start = at(5, 9, 0);
        future.end = at(5, 10, 0);
        let repo = MemoryRepository::with_tasks([future]).unwrap();

        let config = SchedulerConfig {
            day_walk_start: DayWalkStart::TaskStart,
            ..SchedulerConfig::default()
        };
        let scheduler = AutoScheduler::with_config(&repo, config);
        let outcome = scheduler.schedule_at("u1", &ids(&["future"]), now()).unwrap();
        assert_eq!(outcome.placed[0].start, at(5, 8, 0));
    }

    #[test]
    fn working_hours_replace_the_fixed_window_per_weekday() {
        let repo = MemoryRepository::with_tasks([make_test_task("t", 3, 60, at(4, 23, 0))]).unwrap();
        repo.set_working_hours(WorkingHours {
            owner_id: "u1".to_string(),
            weekday: Weekday::Mon,
            start: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        })
        .unwrap();

        let fixed = AutoScheduler::new(&repo)
            .schedule_at("u1", &ids(&["t"]), now())
            .unwrap();
        assert_eq!(fixed.placed[0].start, at(2, 8, 0));

        let config = SchedulerConfig {
            window_source: WindowSource::WorkingHours,
            ..SchedulerConfig::default()
        };
        let per_day = AutoScheduler::with_config(&repo, config)
            .schedule_at("u1", &ids(&["t"]), now())
            .unwrap();
        assert_eq!(per_day.placed[0].start, at(2, 13, 0));
    }

    #[test]
    fn empty_working_hours_skip_the_day() {
        let repo = MemoryRepository::with_tasks([make_test_task("t", 3, 60, at(4, 23, 0))]).unwrap();
        repo.set_working_hours(WorkingHours {
            owner_id: "u1".to_string(),
            weekday: Weekday::Mon,
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        })
        .unwrap();
        let config = SchedulerConfig {
            window_source: WindowSource::WorkingHours,
            ..SchedulerConfig::default()
        };
        let outcome = AutoScheduler::with_config(&repo, config)
            .schedule_at("u1", &ids(&["t"]), now())
            .unwrap();
        assert_eq!(outcome.placed[0].start, at(3, 8, 0));
    }

    #[test]
    fn horizon_ceiling_bounds_the_walk() {
        let repo = MemoryRepository::with_tasks([
            make_test_task("t", 3, 60, at(20, 23, 0)),
            obstacle("busy-mon", at(2, 8, 0), at(2, 22, 0)),
            obstacle("busy-tue", at(3, 8, 0), at(3, 22, 0)),
        ]).unwrap();
        let config = SchedulerConfig {
            max_horizon_days: 2,
            ..SchedulerConfig::default()
        };
        let outcome = AutoScheduler::with_config(&repo, config)
            .schedule_at("u1", &ids(&["t"]), now())
            .unwrap();
        assert_eq!(outcome.unplaced, vec!["t".to_string()]);
    }

    #[test]
    fn overnight_obstacle_from_previous_day_is_respected() {
        let repo = MemoryRepository::with_tasks([
            make_test_task("t", 3, 60, at(3, 23, 0)),
            obstacle("flight", at(1, 20, 0), at(2, 9, 30)),
        ]).unwrap();
        let outcome = AutoScheduler::new(&repo)
            .schedule_at("u1", &ids(&["t"]), now())
            .unwrap();
        assert_eq!(outcome.placed[0].start, at(2, 9, 30));
    }

    #[test]
    fn repeated_ids_are_scheduled_once() {
        let repo = MemoryRepository::with_tasks([make_test_task("t", 3, 60, at(2, 23, 0))]).unwrap();
        let outcome = AutoScheduler::new(&repo)
            .schedule_at("u1", &ids(&["t", "t"]), now())
            .unwrap();
        assert_eq!(outcome.placed.len(), 1);
    }

    #[test]
    fn horizon_covers_today_and_whole_days() {
        let targets = vec![make_test_task("t", 3, 60, at(4, 15, 30))];
        let h = horizon(&targets, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()).unwrap();
        assert_eq!(h.start(), at(1, 0, 0));
        assert_eq!(h.end(), at(5, 0, 0));
    }
}
