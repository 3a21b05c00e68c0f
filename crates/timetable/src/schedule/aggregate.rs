/// Day bucketing and slot occupancy for a weekly schedule
use super::filter;
use super::slots::TimeSlot;
use super::types::{LectureEvent, Weekday};
use serde::Serialize;

/// Key of a day bucket: one of the teaching days, or the catch-all for
/// lectures whose day is missing or outside the displayed days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BucketKey {
    Day(Weekday),
    Unscheduled,
}

impl BucketKey {
    pub fn label(&self) -> &'static str {
        match self {
            BucketKey::Day(day) => day.as_str(),
            BucketKey::Unscheduled => "Unscheduled",
        }
    }
}

/// Total, disjoint partition of a lecture list by day.
///
/// Buckets hold indices into the list they were built from and are kept in
/// day order with `Unscheduled` last. Within a bucket lectures are sorted by
/// start time, ties keeping input order; lectures without a parseable start
/// go after the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBuckets {
    entries: Vec<(BucketKey, Vec<usize>)>,
}

impl DayBuckets {
    pub fn partition(events: &[LectureEvent], day_labels: &[Weekday]) -> Self {
        let mut entries: Vec<(BucketKey, Vec<usize>)> = Vec::with_capacity(day_labels.len() + 1);
        for day in day_labels {
            let key = BucketKey::Day(*day);
            if !entries.iter().any(|(k, _)| *k == key) {
                entries.push((key, Vec::new()));
            }
        }
        entries.push((BucketKey::Unscheduled, Vec::new()));
        let unscheduled = entries.len() - 1;

        for (idx, event) in events.iter().enumerate() {
            let target = event
                .day_of_week
                .and_then(|day| entries.iter().position(|(k, _)| *k == BucketKey::Day(day)))
                .unwrap_or(unscheduled);
            entries[target].1.push(idx);
        }

        for (_, bucket) in &mut entries {
            bucket.sort_by_cached_key(|idx| {
                let start = events[*idx].start();
                (start.is_none(), start)
            });
        }

        Self { entries }
    }

    /// The days this partition was built for, in display order.
    pub fn days(&self) -> impl Iterator<Item = Weekday> + '_ {
        self.entries.iter().filter_map(|(key, _)| match key {
            BucketKey::Day(day) => Some(*day),
            BucketKey::Unscheduled => None,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = BucketKey> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    /// Indices of the lectures in `key`'s bucket; empty for an unknown key.
    pub fn indices(&self, key: BucketKey) -> &[usize] {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, bucket)| bucket.as_slice())
            .unwrap_or(&[])
    }

    /// Number of lectures across all buckets.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, bucket)| bucket.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Day × slot occupancy.
///
/// A lecture occupies slot `t` iff `start <= t <= end`, both ends inclusive,
/// so a lecture ending exactly on a slot boundary still shows in that row.
/// This one rule backs both the on-screen timeline and the printed sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyMatrix {
    days: Vec<Weekday>,
    slots: Vec<TimeSlot>,
    /// `cells[day][slot]`, each a list of lecture indices in bucket order.
    cells: Vec<Vec<Vec<usize>>>,
    /// Lectures in a day bucket whose start or end could not be parsed, or
    /// that end before they start.
    unplaced: Vec<usize>,
}

impl OccupancyMatrix {
    pub fn build(events: &[LectureEvent], buckets: &DayBuckets, slots: &[TimeSlot]) -> Self {
        let days: Vec<Weekday> = buckets.days().collect();
        let mut cells = vec![vec![Vec::new(); slots.len()]; days.len()];
        let mut unplaced = Vec::new();

        for (day_idx, day) in days.iter().enumerate() {
            for &idx in buckets.indices(BucketKey::Day(*day)) {
                let event = &events[idx];
                let (Some(start), Some(end)) = (event.start(), event.end()) else {
                    unplaced.push(idx);
                    continue;
                };
                if end < start {
                    unplaced.push(idx);
                    continue;
                }
                for (slot_idx, slot) in slots.iter().enumerate() {
                    if start <= slot.time() && slot.time() <= end {
                        cells[day_idx][slot_idx].push(idx);
                    }
                }
            }
        }

        Self {
            days,
            slots: slots.to_vec(),
            cells,
            unplaced,
        }
    }

    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    /// Lecture indices in the `(day, slot)` cell; empty when out of range.
    pub fn cell(&self, day: Weekday, slot_index: usize) -> &[usize] {
        self.days
            .iter()
            .position(|d| *d == day)
            .and_then(|day_idx| self.cells[day_idx].get(slot_index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Index of the slot with the given label, if present.
    pub fn slot_index(&self, label: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.label() == label)
    }

    pub fn unplaced(&self) -> &[usize] {
        &self.unplaced
    }
}

/// Result of one aggregation pass over a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    events: Vec<LectureEvent>,
    buckets: DayBuckets,
    matrix: OccupancyMatrix,
}

/// Filters `events` once, buckets the survivors by day and builds the
/// occupancy matrix over `slots`.
pub fn aggregate(
    events: &[LectureEvent],
    query: &str,
    day_labels: &[Weekday],
    slots: &[TimeSlot],
) -> Aggregation {
    let events = filter::filter(events, query);
    let buckets = DayBuckets::partition(&events, day_labels);
    let matrix = OccupancyMatrix::build(&events, &buckets, slots);
    Aggregation {
        events,
        buckets,
        matrix,
    }
}

impl Aggregation {
    /// The filtered lectures every view of this pass is derived from.
    pub fn events(&self) -> &[LectureEvent] {
        &self.events
    }

    pub fn day_buckets(&self) -> &DayBuckets {
        &self.buckets
    }

    pub fn matrix(&self) -> &OccupancyMatrix {
        &self.matrix
    }

    pub fn bucket(&self, key: BucketKey) -> Vec<&LectureEvent> {
        resolve(&self.events, self.buckets.indices(key))
    }

    /// Every bucket in display order with its sorted lectures.
    pub fn buckets(&self) -> Vec<(BucketKey, Vec<&LectureEvent>)> {
        self.buckets
            .keys()
            .map(|key| (key, self.bucket(key)))
            .collect()
    }

    pub fn cell(&self, day: Weekday, slot_index: usize) -> Vec<&LectureEvent> {
        resolve(&self.events, self.matrix.cell(day, slot_index))
    }

    pub fn unplaced(&self) -> Vec<&LectureEvent> {
        resolve(&self.events, self.matrix.unplaced())
    }

    pub(crate) fn into_parts(self) -> (Vec<LectureEvent>, DayBuckets, OccupancyMatrix) {
        (self.events, self.buckets, self.matrix)
    }
}

pub(crate) fn resolve<'a>(events: &'a [LectureEvent], indices: &[usize]) -> Vec<&'a LectureEvent> {
    indices.iter().filter_map(|idx| events.get(*idx)).collect()
}
