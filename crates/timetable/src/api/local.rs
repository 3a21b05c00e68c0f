//! In-memory implementation of [`TimetableApi`], compiled for tests and the
//! `test-util` feature only.
//!
//! Holds rooms, stages, lecturers and lectures in plain vectors and mimics
//! the server's booking rejections, so the session types can be exercised
//! without a network. Hooks let callers inject a failure or delay individual
//! lookups.

use super::error::{ApiError, ApiResult};
use super::{LectureQuery, NewLecture, NewRoom, Resource, TimetableApi};
use crate::lecturers::{Cursor, LecturerQuery, LecturerSummary, NewLecturer, PageWindow};
use crate::schedule::{parse_wall_time, LectureEvent, LecturerRef, RoomRef, StageRef, Weekday};
use crate::types::EntityId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// In-memory timetable server.
#[derive(Clone, Default)]
pub struct LocalTimetableApi {
    data: Arc<RwLock<LocalData>>,
}

#[derive(Default)]
struct LocalData {
    rooms: Vec<RoomRef>,
    stages: Vec<StageRef>,
    lecturers: Vec<LecturerSummary>,
    lectures: Vec<LectureEvent>,

    next_id: i64,

    // Test hooks
    fail_next: Option<ApiError>,
    search_latency: HashMap<String, Duration>,
    lecture_latency: HashMap<EntityId, Duration>,
    lecturer_requests: Vec<LecturerQuery>,
}

impl LocalData {
    fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId::Int(self.next_id)
    }
}

impl LocalTimetableApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_room(&self, name: &str) -> EntityId {
        let mut data = self.write();
        let id = data.allocate_id();
        data.rooms.push(RoomRef {
            id: Some(id.clone()),
            room_name: Some(name.to_string()),
        });
        id
    }

    pub fn add_stage(&self, name: &str) -> EntityId {
        let mut data = self.write();
        let id = data.allocate_id();
        data.stages.push(StageRef {
            id: Some(id.clone()),
            name: Some(name.to_string()),
        });
        id
    }

    pub fn add_lecturer(&self, name: &str, day_offs: &[Weekday]) -> EntityId {
        let mut data = self.write();
        let id = data.allocate_id();
        data.lecturers.push(LecturerSummary {
            id: id.clone(),
            name: name.to_string(),
            day_offs: day_offs.to_vec(),
        });
        id
    }

    /// Stores a lecture record as-is, bypassing booking checks.
    pub fn insert_lecture(&self, lecture: LectureEvent) {
        self.write().lectures.push(lecture);
    }

    pub fn lectures(&self) -> Vec<LectureEvent> {
        self.read().lectures.clone()
    }

    pub fn lecturers(&self) -> Vec<LecturerSummary> {
        self.read().lecturers.clone()
    }

    /// Makes the next request of any kind fail with `error`.
    pub fn fail_next_request(&self, error: ApiError) {
        self.write().fail_next = Some(error);
    }

    /// Delays lecturer lookups whose search text equals `search`.
    pub fn set_search_latency(&self, search: &str, latency: Duration) {
        self.write().search_latency.insert(search.to_string(), latency);
    }

    /// Delays lecture listings for one stage.
    pub fn set_lecture_latency(&self, stage_id: &EntityId, latency: Duration) {
        self.write().lecture_latency.insert(stage_id.clone(), latency);
    }

    /// Every lecturer query received so far, in arrival order.
    pub fn lecturer_requests(&self) -> Vec<LecturerQuery> {
        self.read().lecturer_requests.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, LocalData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LocalData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(&self) -> ApiResult<()> {
        match self.write().fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn overlaps(a: &LectureEvent, start: chrono::NaiveTime, end: chrono::NaiveTime) -> bool {
    match (a.start(), a.end()) {
        (Some(a_start), Some(a_end)) => a_start < end && start < a_end,
        _ => false,
    }
}

fn conflict(message: String) -> ApiError {
    ApiError::Conflict {
        status: 409,
        message,
    }
}

fn not_found(resource: Resource, id: &EntityId) -> ApiError {
    ApiError::Conflict {
        status: 404,
        message: format!("{} {} not found", resource.path(), id),
    }
}

#[async_trait]
impl TimetableApi for LocalTimetableApi {
    async fn list_lectures(&self, query: &LectureQuery) -> ApiResult<Vec<LectureEvent>> {
        let latency = self.read().lecture_latency.get(&query.stage_id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.check_failure()?;
        let data = self.read();
        Ok(data
            .lectures
            .iter()
            .filter(|l| {
                l.stage
                    .as_ref()
                    .and_then(|s| s.id.as_ref())
                    .is_some_and(|id| *id == query.stage_id)
            })
            .cloned()
            .collect())
    }

    async fn list_lecturers(&self, query: &LecturerQuery) -> ApiResult<PageWindow> {
        let latency = {
            let mut data = self.write();
            data.lecturer_requests.push(query.clone());
            query
                .search
                .as_ref()
                .and_then(|s| data.search_latency.get(s).copied())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.check_failure()?;

        let offset = match &query.cursor {
            Some(cursor) => cursor.as_str().parse::<usize>().map_err(|_| {
                ApiError::invalid_input(format!("Malformed cursor: {}", cursor))
            })?,
            None => 0,
        };
        let limit = query.limit.max(1) as usize;

        let data = self.read();
        let needle = query.search.as_deref().map(str::to_lowercase);
        let matching: Vec<&LecturerSummary> = data
            .lecturers
            .iter()
            .filter(|l| match &needle {
                Some(needle) => l.name.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .collect();

        let items = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|l| (*l).clone())
            .collect();
        let next = (offset + limit < matching.len())
            .then(|| Cursor::new((offset + limit).to_string()));
        let prev = (offset > 0).then(|| Cursor::new(offset.saturating_sub(limit).to_string()));

        Ok(PageWindow {
            items,
            next,
            prev,
            limit: query.limit,
        })
    }

    async fn list_rooms(&self) -> ApiResult<Vec<RoomRef>> {
        self.check_failure()?;
        Ok(self.read().rooms.clone())
    }

    async fn list_stages(&self) -> ApiResult<Vec<StageRef>> {
        self.check_failure()?;
        Ok(self.read().stages.clone())
    }

    async fn create_lecture(&self, lecture: &NewLecture) -> ApiResult<()> {
        self.check_failure()?;
        let (start, end) = match (
            parse_wall_time(&lecture.start_time),
            parse_wall_time(&lecture.end_time),
        ) {
            (Some(start), Some(end)) if end >= start => (start, end),
            _ => return Err(ApiError::invalid_input("Invalid lecture time range")),
        };

        let mut data = self.write();
        let room = data
            .rooms
            .iter()
            .find(|r| r.id.as_ref() == Some(&lecture.room_id))
            .cloned()
            .ok_or_else(|| not_found(Resource::Room, &lecture.room_id))?;
        let stage = data
            .stages
            .iter()
            .find(|s| s.id.as_ref() == Some(&lecture.stage_id))
            .cloned();

        let mut lecturers = Vec::with_capacity(lecture.lecturer_ids.len());
        for id in &lecture.lecturer_ids {
            let lecturer = data
                .lecturers
                .iter()
                .find(|l| l.id == *id)
                .ok_or_else(|| not_found(Resource::Lecturer, id))?;
            if let Some(day) = lecture.day_of_week {
                if lecturer.day_offs.contains(&day) {
                    return Err(conflict(format!(
                        "Lecturer {} is off on {}",
                        lecturer.name, day
                    )));
                }
            }
            lecturers.push(LecturerRef {
                id: Some(lecturer.id.clone()),
                name: Some(lecturer.name.clone()),
            });
        }

        if let Some(day) = lecture.day_of_week {
            let booked = data.lectures.iter().any(|existing| {
                existing.day_of_week == Some(day)
                    && existing.room.as_ref().and_then(|r| r.id.as_ref()) == Some(&lecture.room_id)
                    && overlaps(existing, start, end)
            });
            if booked {
                return Err(conflict(format!(
                    "Room {} is already booked on {} at that time",
                    room.room_name.as_deref().unwrap_or("?"),
                    day
                )));
            }
        }

        let id = data.allocate_id();
        data.lectures.push(LectureEvent {
            id,
            course_name: lecture.course_name.clone(),
            day_of_week: lecture.day_of_week,
            start_time: Some(lecture.start_time.clone()),
            end_time: Some(lecture.end_time.clone()),
            room: Some(room),
            stage,
            lecturers,
        });
        Ok(())
    }

    async fn create_lecturer(&self, lecturer: &NewLecturer) -> ApiResult<()> {
        self.check_failure()?;
        self.add_lecturer(&lecturer.name, &lecturer.day_offs);
        Ok(())
    }

    async fn create_room(&self, room: &NewRoom) -> ApiResult<()> {
        self.check_failure()?;
        self.add_room(&room.room_name);
        Ok(())
    }

    async fn delete(&self, resource: Resource, id: &EntityId) -> ApiResult<()> {
        self.check_failure()?;
        let mut data = self.write();
        let removed = match resource {
            Resource::Lecture => {
                let before = data.lectures.len();
                data.lectures.retain(|l| l.id != *id);
                before != data.lectures.len()
            }
            Resource::Lecturer => {
                let before = data.lecturers.len();
                data.lecturers.retain(|l| l.id != *id);
                before != data.lecturers.len()
            }
            Resource::Room => {
                let before = data.rooms.len();
                data.rooms.retain(|r| r.id.as_ref() != Some(id));
                before != data.rooms.len()
            }
        };
        if removed {
            Ok(())
        } else {
            Err(not_found(resource, id))
        }
    }

    async fn update_day_offs(&self, id: &EntityId, day_offs: &[Weekday]) -> ApiResult<()> {
        self.check_failure()?;
        let mut data = self.write();
        let lecturer = data
            .lecturers
            .iter_mut()
            .find(|l| l.id == *id)
            .ok_or_else(|| not_found(Resource::Lecturer, id))?;
        lecturer.day_offs = day_offs.to_vec();
        Ok(())
    }
}
