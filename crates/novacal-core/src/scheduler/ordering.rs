//! Placement order for a batch of tasks.
//!
//! Earliest effective deadline first, then higher importance, then longer
//! duration. The sort is stable, so tasks that tie on all three keys keep
//! the order they were given in.

use std::cmp::Ordering;

use crate::schedule::Task;

/// Compare two tasks by placement priority (`Less` = placed first).
pub fn compare_for_placement(a: &Task, b: &Task) -> Ordering {
    a.effective_deadline()
        .cmp(&b.effective_deadline())
        .then_with(|| b.importance.cmp(&a.importance))
        .then_with(|| b.duration().cmp(&a.duration()))
}

/// Sort tasks in place into placement order.
pub fn order_for_placement(tasks: &mut [Task]) {
    tasks.sort_by(compare_for_placement);
}
