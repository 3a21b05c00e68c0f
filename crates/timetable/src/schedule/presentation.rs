//! Grid, timeline and print view models built from a single filtered snapshot.

use super::aggregate::{aggregate, resolve, BucketKey, DayBuckets, OccupancyMatrix};
use super::slots::{SlotRange, TimeSlot};
use super::types::{LectureEvent, Weekday};
use std::fmt::Write;
use tracing::debug;

/// Days and slot boundaries for the on-screen and printed layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    pub days: Vec<Weekday>,
    pub screen_slots: Vec<TimeSlot>,
    pub print_slots: Vec<TimeSlot>,
}

impl LayoutConfig {
    pub fn new(days: Vec<Weekday>, screen: &SlotRange, print: &SlotRange) -> Self {
        Self {
            days,
            screen_slots: screen.slots(),
            print_slots: print.slots(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let range = SlotRange::default();
        Self::new(Weekday::ALL.to_vec(), &range, &range)
    }
}

/// Everything the week screen and the print sheet render.
///
/// Built once per (snapshot, query). The grid, the timeline and the print
/// matrix all index into the same filtered lecture list, and both matrices
/// come out of [`OccupancyMatrix::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulePresentation {
    events: Vec<LectureEvent>,
    buckets: DayBuckets,
    timeline: OccupancyMatrix,
    print: OccupancyMatrix,
}

impl SchedulePresentation {
    pub fn build(events: &[LectureEvent], query: &str, layout: &LayoutConfig) -> Self {
        let (events, buckets, timeline) =
            aggregate(events, query, &layout.days, &layout.screen_slots).into_parts();

        let print = if layout.print_slots == layout.screen_slots {
            timeline.clone()
        } else {
            OccupancyMatrix::build(&events, &buckets, &layout.print_slots)
        };

        debug!(
            shown = events.len(),
            unplaced = timeline.unplaced().len(),
            unscheduled = buckets.indices(BucketKey::Unscheduled).len(),
            "Built schedule presentation"
        );

        Self {
            events,
            buckets,
            timeline,
            print,
        }
    }

    pub fn events(&self) -> &[LectureEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sorted lectures of one grid column.
    pub fn grid_column(&self, key: BucketKey) -> Vec<&LectureEvent> {
        resolve(&self.events, self.buckets.indices(key))
    }

    /// All grid columns in display order, `Unscheduled` last.
    pub fn grid(&self) -> Vec<(BucketKey, Vec<&LectureEvent>)> {
        self.buckets
            .keys()
            .map(|key| (key, self.grid_column(key)))
            .collect()
    }

    pub fn timeline(&self) -> &OccupancyMatrix {
        &self.timeline
    }

    pub fn print_matrix(&self) -> &OccupancyMatrix {
        &self.print
    }

    pub fn timeline_cell(&self, day: Weekday, slot_index: usize) -> Vec<&LectureEvent> {
        resolve(&self.events, self.timeline.cell(day, slot_index))
    }

    pub fn print_cell(&self, day: Weekday, slot_index: usize) -> Vec<&LectureEvent> {
        resolve(&self.events, self.print.cell(day, slot_index))
    }

    /// Plain-text rendering of the grid view.
    pub fn render_grid_text(&self) -> String {
        let mut out = String::new();
        for (key, lectures) in self.grid() {
            if key == BucketKey::Unscheduled && lectures.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{}", key.label());
            if lectures.is_empty() {
                let _ = writeln!(out, "  (no lectures scheduled)");
            }
            for lecture in lectures {
                let _ = writeln!(out, "  {}", describe(lecture));
            }
        }
        out
    }

    pub fn print_sheet(
        &self,
        stage_label: impl Into<String>,
        week_label: impl Into<String>,
    ) -> PrintSheet<'_> {
        PrintSheet {
            title: format!("جدول محاضرات {}", stage_label.into()),
            week_label: week_label.into(),
            presentation: self,
        }
    }
}

/// The printed timetable: a header plus the print matrix.
#[derive(Debug, Clone)]
pub struct PrintSheet<'a> {
    pub title: String,
    pub week_label: String,
    presentation: &'a SchedulePresentation,
}

impl PrintSheet<'_> {
    /// Pipe-separated table, one row per print slot.
    pub fn render_text(&self) -> String {
        let matrix = self.presentation.print_matrix();
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "{}", self.week_label);

        let header: Vec<&str> = std::iter::once("الوقت")
            .chain(matrix.days().iter().map(Weekday::arabic_name))
            .collect();
        let _ = writeln!(out, "{}", header.join(" | "));

        for (slot_idx, slot) in matrix.slots().iter().enumerate() {
            let mut row = vec![slot.label()];
            for day in matrix.days() {
                let names: Vec<&str> = self
                    .presentation
                    .print_cell(*day, slot_idx)
                    .into_iter()
                    .map(|lecture| lecture.course_name.as_str())
                    .collect();
                row.push(if names.is_empty() {
                    "—".to_string()
                } else {
                    names.join("; ")
                });
            }
            let _ = writeln!(out, "{}", row.join(" | "));
        }
        out
    }
}

fn describe(lecture: &LectureEvent) -> String {
    let mut line = format!("{} {}", lecture.time_range_label(), lecture.course_name);
    if let Some(room) = lecture.room_name() {
        let _ = write!(line, " ({room})");
    }
    let names: Vec<&str> = lecture.lecturer_names().collect();
    if !names.is_empty() {
        let _ = write!(line, " [{}]", names.join(", "));
    }
    line
}
