//! Time interval utilities
//!
//! Pure functions over local times of day: interval overlap, checked minute
//! arithmetic, grid rounding and free-slot search inside a business window.

use std::fmt;

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::utils::errors::{Result, SecretaryBotError};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Half-open interval `[start, end)` within a single day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Build a range, rejecting empty or inverted intervals
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end <= start {
            return Err(SecretaryBotError::InvalidInput(format!(
                "End time {} must be after start time {}",
                end.format("%H:%M"),
                start.format("%H:%M")
            )));
        }
        Ok(Self { start, end })
    }

    /// Range of `minutes` starting at `start`; `None` when it would cross midnight
    pub fn from_duration(start: NaiveTime, minutes: u32) -> Option<Self> {
        if minutes == 0 {
            return None;
        }
        let end = add_minutes(start, minutes)?;
        Some(Self { start, end })
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        overlaps(self, other)
    }

    pub fn duration_minutes(&self) -> u32 {
        ((self.end - self.start).num_minutes()).max(0) as u32
    }

    /// Grow the range by `before` minutes at the start and `after` minutes at the end,
    /// clamped to the day boundaries
    pub fn padded(&self, before: u32, after: u32) -> TimeRange {
        let start = sub_minutes(self.start, before).unwrap_or_else(start_of_day);
        let end = add_minutes(self.end, after).unwrap_or_else(end_of_day);
        TimeRange { start, end }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// `a.start < b.end && a.end > b.start`; touching intervals do not overlap
pub fn overlaps(a: &TimeRange, b: &TimeRange) -> bool {
    a.start < b.end && a.end > b.start
}

fn start_of_day() -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt(0, 0).unwrap_or_default()
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
}

/// Add minutes without wrapping past midnight
pub fn add_minutes(time: NaiveTime, minutes: u32) -> Option<NaiveTime> {
    let (result, overflow) = time.overflowing_add_signed(Duration::minutes(minutes as i64));
    if overflow != 0 {
        return None;
    }
    Some(result)
}

/// Subtract minutes without wrapping before midnight
pub fn sub_minutes(time: NaiveTime, minutes: u32) -> Option<NaiveTime> {
    let (result, overflow) = time.overflowing_sub_signed(Duration::minutes(minutes as i64));
    if overflow != 0 {
        return None;
    }
    Some(result)
}

/// Round up to the next `grid_minutes` boundary; boundaries map to themselves
pub fn round_up_to_grid(time: NaiveTime, grid_minutes: u32) -> Option<NaiveTime> {
    if grid_minutes == 0 {
        return Some(time);
    }
    let mut minutes = time.hour() * 60 + time.minute();
    if time.second() > 0 || time.nanosecond() > 0 {
        minutes += 1;
    }
    let rounded = minutes.div_ceil(grid_minutes) * grid_minutes;
    if rounded >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(rounded * 60, 0)
}

/// Minutes between two times of day, negative when `to` precedes `from`
pub fn minutes_between(from: NaiveTime, to: NaiveTime) -> i64 {
    (to - from).num_minutes()
}

/// Scan `window` from its start in steps of `step_minutes`, returning up to `max`
/// ranges of `duration_minutes` that fit inside the window and touch no occupied range
pub fn find_free_slots(
    window: TimeRange,
    step_minutes: u32,
    duration_minutes: u32,
    occupied: &[TimeRange],
    max: usize,
) -> Vec<TimeRange> {
    let mut slots = Vec::new();
    if duration_minutes == 0 || max == 0 {
        return slots;
    }
    let step = if step_minutes == 0 { duration_minutes } else { step_minutes };

    let mut cursor = window.start;
    while slots.len() < max {
        let Some(candidate) = TimeRange::from_duration(cursor, duration_minutes) else {
            break;
        };
        if candidate.end > window.end {
            break;
        }
        if !occupied.iter().any(|busy| busy.overlaps(&candidate)) {
            slots.push(candidate);
        }
        match add_minutes(cursor, step) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    slots
}
