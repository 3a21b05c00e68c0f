//! Data layer for a university lecture timetable.
//!
//! * [`schedule`] turns a week of lectures into day columns, a slot-by-day
//!   occupancy matrix and a printable sheet.
//! * [`lecturers`] pages through the lecturer directory and runs the
//!   debounced per-row lookups of the compose form.
//! * [`api`] is the remote server, over HTTP or in memory.

pub mod api;
pub mod compose;
pub mod config;
pub mod lecturers;
pub mod schedule;
pub mod types;

pub use api::{ApiError, ApiResult, HttpTimetableApi, TimetableApi};
#[cfg(any(test, feature = "test-util"))]
pub use api::LocalTimetableApi;
pub use compose::{ComposeSession, LectureDraft};
pub use config::{ConfigError, TimetableConfig};
pub use types::{EntityId, FetchOutcome, Notice, NoticeLevel};
