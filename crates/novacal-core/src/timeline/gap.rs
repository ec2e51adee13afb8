//! Free slot detection inside a working window.
//!
//! Finds the time left over between busy intervals so the allocator can
//! place tasks into it.

use chrono::Duration;

use super::Interval;

/// Finder for free slots in a window
pub struct FreeSlotFinder {
    /// Slots shorter than this are dropped
    min_slot: Duration,
}

impl FreeSlotFinder {
    /// Create a finder that reports every non-empty gap
    pub fn new() -> Self {
        Self {
            min_slot: Duration::zero(),
        }
    }

    /// Set the minimum slot length
    pub fn with_min_slot(mut self, min_slot: Duration) -> Self {
        self.min_slot = min_slot;
        self
    }

    /// Find free slots in `window` that no busy interval covers.
    ///
    /// Busy intervals may be unsorted, overlapping or nested, and may extend
    /// past the window; they are clipped to it first.
    ///
    /// # Returns
    /// Strictly increasing, disjoint slots inside `window`
    pub fn find_slots(&self, window: Interval, busy: &[Interval]) -> Vec<Interval> {
        let mut sorted: Vec<Interval> = busy.iter().filter_map(|b| b.clip_to(&window)).collect();
        sorted.sort_by_key(|b| b.start());

        let mut slots = Vec::new();
        let mut cursor = window.start();

        for interval in &sorted {
            if interval.start() > cursor {
                self.push_slot(&mut slots, cursor, interval.start());
            }
            // Advancing to the max merges overlapping and nested intervals.
            cursor = cursor.max(interval.end());
        }

        if cursor < window.end() {
            self.push_slot(&mut slots, cursor, window.end());
        }

        slots
    }

    fn push_slot(
        &self,
        slots: &mut Vec<Interval>,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) {
        if let Ok(slot) = Interval::new(start, end) {
            if slot.duration() >= self.min_slot {
                slots.push(slot);
            }
        }
    }
}

impl Default for FreeSlotFinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to find free slots with default settings
pub fn free_slots(window: Interval, busy: &[Interval]) -> Vec<Interval> {
    FreeSlotFinder::new().find_slots(window, busy)
}
