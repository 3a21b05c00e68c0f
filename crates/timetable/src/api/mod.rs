//! The remote timetable server as seen by the data layer.
//!
//! Everything the core needs from the server goes through [`TimetableApi`].
//! [`HttpTimetableApi`] talks to the real REST endpoints. With the
//! `test-util` feature, `LocalTimetableApi` keeps the same contract in memory
//! for tests.

mod client;
mod error;
#[cfg(any(test, feature = "test-util"))]
mod local;

pub use client::{HttpTimetableApi, HttpTimetableConfig};
pub use error::{ApiError, ApiResult};
#[cfg(any(test, feature = "test-util"))]
pub use local::LocalTimetableApi;

use crate::lecturers::{LecturerQuery, NewLecturer, PageWindow};
use crate::schedule::{LectureEvent, RoomRef, StageRef, Weekday};
use crate::types::{EntityId, Notice};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Query for `GET /lectures`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LectureQuery {
    pub stage_id: EntityId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Payload for `POST /lectures`. Times are `HH:MM`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLecture {
    pub course_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<Weekday>,
    pub start_time: String,
    pub end_time: String,
    pub room_id: EntityId,
    pub stage_id: EntityId,
    pub lecturer_ids: Vec<EntityId>,
}

/// Payload for `POST /rooms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRoom {
    pub room_name: String,
}

/// Resources that can be deleted by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Lecture,
    Lecturer,
    Room,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Lecture => "lectures",
            Resource::Lecturer => "lecturers",
            Resource::Room => "rooms",
        }
    }
}

/// Operations the timetable server offers.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; lookups run on spawned tasks.
#[async_trait]
pub trait TimetableApi: Send + Sync {
    /// Lectures of one stage within a date range.
    async fn list_lectures(&self, query: &LectureQuery) -> ApiResult<Vec<LectureEvent>>;

    /// One page of lecturers, optionally filtered by name.
    async fn list_lecturers(&self, query: &LecturerQuery) -> ApiResult<PageWindow>;

    async fn list_rooms(&self) -> ApiResult<Vec<RoomRef>>;

    async fn list_stages(&self) -> ApiResult<Vec<StageRef>>;

    /// Creates a lecture. Booking conflicts come back as [`ApiError::Conflict`].
    async fn create_lecture(&self, lecture: &NewLecture) -> ApiResult<()>;

    async fn create_lecturer(&self, lecturer: &NewLecturer) -> ApiResult<()>;

    async fn create_room(&self, room: &NewRoom) -> ApiResult<()>;

    async fn delete(&self, resource: Resource, id: &EntityId) -> ApiResult<()>;

    /// Replaces a lecturer's weekly days off.
    async fn update_day_offs(&self, id: &EntityId, day_offs: &[Weekday]) -> ApiResult<()>;
}

/// List responses come either wrapped as `{data: [...]}` or as a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Option<Vec<T>> },
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(items) => items,
            ListEnvelope::Wrapped { data } => data.unwrap_or_default(),
        }
    }
}

/// Rooms and stages for the compose form's pickers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    pub rooms: Vec<RoomRef>,
    pub stages: Vec<StageRef>,
    /// Set when loading failed and the lists fell back to empty.
    pub notice: Option<Notice>,
}

/// Loads rooms and stages concurrently. Either failing empties both lists.
pub async fn load_reference_data<A: TimetableApi + ?Sized>(api: &A) -> ReferenceData {
    match futures::try_join!(api.list_rooms(), api.list_stages()) {
        Ok((rooms, stages)) => ReferenceData {
            rooms,
            stages,
            notice: None,
        },
        Err(e) => {
            warn!(error = %e, "Failed to load rooms and stages");
            ReferenceData {
                rooms: Vec::new(),
                stages: Vec::new(),
                notice: Some(Notice::error(format!("Failed to load rooms and stages: {e}"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_accepts_both_shapes() {
        let wrapped: ListEnvelope<StageRef> =
            serde_json::from_str(r#"{"data":[{"id":1,"name":"Stage 1"}]}"#).unwrap();
        let bare: ListEnvelope<StageRef> =
            serde_json::from_str(r#"[{"id":1,"name":"Stage 1"}]"#).unwrap();
        let empty: ListEnvelope<StageRef> = serde_json::from_str(r#"{"data":null}"#).unwrap();

        assert_eq!(wrapped.into_vec(), bare.into_vec());
        assert!(empty.into_vec().is_empty());
    }

    #[test]
    fn test_lecture_envelope_tolerates_missing_data() {
        let wrapped: ListEnvelope<LectureEvent> = serde_json::from_str(
            r#"{"data":[{"id":1,"course_name":"Optics","day_of_week":"Monday"}]}"#,
        )
        .unwrap();
        let missing: ListEnvelope<LectureEvent> = serde_json::from_str("{}").unwrap();

        let lectures = wrapped.into_vec();
        assert_eq!(lectures.len(), 1);
        assert_eq!(lectures[0].day_of_week, Some(Weekday::Monday));
        assert!(missing.into_vec().is_empty());
    }

    #[test]
    fn test_new_lecture_omits_missing_day() {
        let lecture = NewLecture {
            course_name: "Optics".to_string(),
            day_of_week: None,
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            room_id: EntityId::Int(1),
            stage_id: EntityId::Int(2),
            lecturer_ids: vec![EntityId::Int(3)],
        };
        let json = serde_json::to_value(&lecture).unwrap();
        assert!(json.get("day_of_week").is_none());
        assert_eq!(json["lecturer_ids"], serde_json::json!([3]));
    }

    #[tokio::test]
    async fn test_reference_data_falls_back_to_empty() {
        let api = LocalTimetableApi::new();
        api.add_room("Hall A");
        api.add_stage("Stage 1");
        let loaded = load_reference_data(&api).await;
        assert_eq!(loaded.rooms.len(), 1);
        assert!(loaded.notice.is_none());

        api.fail_next_request(ApiError::Network {
            message: "offline".to_string(),
        });
        let failed = load_reference_data(&api).await;
        assert!(failed.rooms.is_empty() && failed.stages.is_empty());
        assert!(failed.notice.is_some());
    }
}
