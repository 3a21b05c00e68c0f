//! Fixed-width wall-clock slots for the timeline and print layouts.

use super::types::{format_wall_time, parse_wall_time};
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// A slot label on the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeSlot(NaiveTime);

impl TimeSlot {
    pub fn new(time: NaiveTime) -> Self {
        Self(time)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// Zero-padded `HH:MM` label.
    pub fn label(&self) -> String {
        format_wall_time(self.0)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Generates slots from `start` to `end` (inclusive) every `interval_minutes`.
///
/// The first slot is `start`. Generation stops once the next label would be
/// past `end` or past midnight, so `end` only appears when it lies on the
/// interval grid. Inverted bounds or a non-positive interval yield no slots.
pub fn generate(start: NaiveTime, end: NaiveTime, interval_minutes: i64) -> Vec<TimeSlot> {
    if interval_minutes <= 0 || start > end {
        return Vec::new();
    }

    let mut slots = vec![TimeSlot(start)];
    if interval_minutes >= MINUTES_PER_DAY {
        return slots;
    }

    let step = Duration::minutes(interval_minutes);
    let mut current = start;
    loop {
        let (next, wrapped_secs) = current.overflowing_add_signed(step);
        if wrapped_secs != 0 || next > end {
            break;
        }
        slots.push(TimeSlot(next));
        current = next;
    }
    slots
}

/// Same as [`generate`] but over `HH:MM` strings; unparseable bounds give no slots.
pub fn generate_labels(start: &str, end: &str, interval_minutes: i64) -> Vec<TimeSlot> {
    match (parse_wall_time(start), parse_wall_time(end)) {
        (Some(start), Some(end)) => generate(start, end, interval_minutes),
        _ => Vec::new(),
    }
}

/// Slot boundaries as they appear in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRange {
    pub start: String,
    pub end: String,
    pub interval_minutes: i64,
}

impl SlotRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>, interval_minutes: i64) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            interval_minutes,
        }
    }

    pub fn slots(&self) -> Vec<TimeSlot> {
        generate_labels(&self.start, &self.end, self.interval_minutes)
    }
}

impl Default for SlotRange {
    /// The admin tool's day: 08:30 to 20:30 in hourly steps.
    fn default() -> Self {
        Self::new("08:30", "20:30", 60)
    }
}
