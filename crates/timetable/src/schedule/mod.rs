//! Weekly lecture schedule: time slots, search, day buckets and the
//! occupancy matrices behind the grid, timeline and print views.

mod aggregate;
mod filter;
mod presentation;
mod slots;
mod types;
mod week;

pub use aggregate::{aggregate, Aggregation, BucketKey, DayBuckets, OccupancyMatrix};
pub use filter::{filter, matches, SearchQuery};
pub use presentation::{LayoutConfig, PrintSheet, SchedulePresentation};
pub use slots::{generate, generate_labels, SlotRange, TimeSlot};
pub use types::{
    format_wall_time, parse_wall_time, LectureEvent, LecturerRef, RoomRef, StageRef, Weekday,
};
pub use week::{WeekKey, WeekScheduleLoader};
