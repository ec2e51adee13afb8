//! Half-open time interval value type.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SchedulingError;

/// A `[start, end)` interval. The end is exclusive, so two intervals that
/// share a boundary abut without overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    /// Create an interval, rejecting empty or inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SchedulingError> {
        if start >= end {
            return Err(SchedulingError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create an interval of `length` starting at `start`.
    pub fn starting_at(start: DateTime<Utc>, length: Duration) -> Result<Self, SchedulingError> {
        Self::new(start, start + length)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Get duration in whole minutes
    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Check if this interval overlaps another one.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if `other` lies entirely inside this interval.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if this interval can hold something of the given length.
    pub fn can_fit(&self, length: Duration) -> bool {
        self.duration() >= length
    }

    /// The part of this interval that falls inside `bounds`, if any.
    pub fn clip_to(&self, bounds: &Interval) -> Option<Interval> {
        let start = self.start.max(bounds.start);
        let end = self.end.min(bounds.end);
        (start < end).then_some(Interval { start, end })
    }
}
