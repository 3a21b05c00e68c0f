//! The "add lecture" form: draft validation and submission.

use crate::api::{ApiError, ApiResult, NewLecture, TimetableApi};
use crate::lecturers::LecturerSelection;
use crate::schedule::{format_wall_time, parse_wall_time, Weekday};
use crate::types::{EntityId, Notice};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Form contents before validation. Times are `HH:MM` as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LectureDraft {
    pub course_name: String,
    pub day_of_week: Option<Weekday>,
    pub start_time: String,
    pub end_time: String,
    pub room_id: Option<EntityId>,
    pub stage_id: Option<EntityId>,
    /// One entry per lecturer row; `None` for a row with nothing picked.
    pub lecturer_ids: Vec<Option<EntityId>>,
}

impl LectureDraft {
    /// Checks the draft and builds the request payload.
    ///
    /// Empty lecturer rows are dropped and repeated lecturers collapsed,
    /// keeping the first occurrence.
    pub fn validate(&self) -> ApiResult<NewLecture> {
        let course_name = self.course_name.trim();
        if course_name.is_empty() {
            return Err(ApiError::invalid_input("Course name is required"));
        }

        let start = parse_wall_time(&self.start_time)
            .ok_or_else(|| ApiError::invalid_input("Start time is required (HH:MM)"))?;
        let end = parse_wall_time(&self.end_time)
            .ok_or_else(|| ApiError::invalid_input("End time is required (HH:MM)"))?;
        if end < start {
            return Err(ApiError::invalid_input("End time must not be before start time"));
        }

        let room_id = self
            .room_id
            .clone()
            .ok_or_else(|| ApiError::invalid_input("Room is required"))?;
        let stage_id = self
            .stage_id
            .clone()
            .ok_or_else(|| ApiError::invalid_input("Stage is required"))?;

        let mut seen = HashSet::new();
        let lecturer_ids: Vec<EntityId> = self
            .lecturer_ids
            .iter()
            .flatten()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect();
        if lecturer_ids.is_empty() {
            return Err(ApiError::invalid_input("At least one lecturer is required"));
        }

        Ok(NewLecture {
            course_name: course_name.to_string(),
            day_of_week: self.day_of_week,
            start_time: format_wall_time(start),
            end_time: format_wall_time(end),
            room_id,
            stage_id,
            lecturer_ids,
        })
    }
}

/// A compose form bound to the server: the draft plus its lecturer rows.
pub struct ComposeSession<A: ?Sized> {
    api: Arc<A>,
    draft: LectureDraft,
    lecturers: LecturerSelection<A>,
}

impl<A: TimetableApi + ?Sized + 'static> ComposeSession<A> {
    /// Starts with an empty draft and a single lecturer row.
    pub fn new(api: Arc<A>, debounce: Duration, lookup_limit: u32) -> Self {
        let lecturers = LecturerSelection::new(Arc::clone(&api), debounce, lookup_limit);
        lecturers.add_row();
        Self {
            api,
            draft: LectureDraft::default(),
            lecturers,
        }
    }

    pub fn draft(&self) -> &LectureDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut LectureDraft {
        &mut self.draft
    }

    pub fn lecturers(&self) -> &LecturerSelection<A> {
        &self.lecturers
    }

    /// The draft with lecturer ids taken from the rows, in row order.
    pub fn collect_draft(&self) -> LectureDraft {
        let mut draft = self.draft.clone();
        draft.lecturer_ids = self
            .lecturers
            .rows()
            .into_iter()
            .map(|row| self.lecturers.selected(row).ok().flatten())
            .collect();
        draft
    }

    /// Validates and sends the lecture. On success the form starts over.
    ///
    /// Server rejections come back unchanged so their message can be shown
    /// as-is; the draft is kept for correction.
    pub async fn submit(&mut self) -> ApiResult<Notice> {
        let lecture = self.collect_draft().validate()?;

        if let Err(e) = self.api.create_lecture(&lecture).await {
            warn!(course = %lecture.course_name, error = %e, "Lecture was not created");
            return Err(e);
        }

        info!(
            course = %lecture.course_name,
            stage_id = %lecture.stage_id,
            lecturers = lecture.lecturer_ids.len(),
            "Lecture created"
        );
        self.draft = LectureDraft::default();
        self.lecturers.reset();
        Ok(Notice::success("Lecture added"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LocalTimetableApi;
    use crate::lecturers::LecturerSummary;

    fn valid_draft() -> LectureDraft {
        LectureDraft {
            course_name: " Optics ".to_string(),
            day_of_week: Some(Weekday::Monday),
            start_time: "9:00".to_string(),
            end_time: "11:00".to_string(),
            room_id: Some(EntityId::Int(1)),
            stage_id: Some(EntityId::Int(2)),
            lecturer_ids: vec![Some(EntityId::Int(3))],
        }
    }

    #[test]
    fn test_valid_draft_builds_payload() {
        let mut draft = valid_draft();
        draft.lecturer_ids = vec![
            Some(EntityId::Int(3)),
            None,
            Some(EntityId::Int(4)),
            Some(EntityId::Int(3)),
        ];
        let lecture = draft.validate().unwrap();
        assert_eq!(lecture.course_name, "Optics");
        assert_eq!(lecture.start_time, "09:00");
        assert_eq!(lecture.lecturer_ids, vec![EntityId::Int(3), EntityId::Int(4)]);
    }

    #[test]
    fn test_invalid_drafts_are_rejected() {
        let cases: Vec<(&str, Box<dyn Fn(&mut LectureDraft)>)> = vec![
            ("course", Box::new(|d: &mut LectureDraft| d.course_name = "  ".to_string())),
            ("start", Box::new(|d: &mut LectureDraft| d.start_time = String::new())),
            ("end", Box::new(|d: &mut LectureDraft| d.end_time = "25:00".to_string())),
            ("order", Box::new(|d: &mut LectureDraft| d.end_time = "08:00".to_string())),
            ("room", Box::new(|d: &mut LectureDraft| d.room_id = None)),
            ("stage", Box::new(|d: &mut LectureDraft| d.stage_id = None)),
            ("lecturers", Box::new(|d: &mut LectureDraft| d.lecturer_ids = vec![None, None])),
        ];
        for (name, mutate) in cases {
            let mut draft = valid_draft();
            mutate(&mut draft);
            assert!(
                matches!(draft.validate(), Err(ApiError::InvalidInput { .. })),
                "case {name} should fail"
            );
        }

        let mut same_time = valid_draft();
        same_time.end_time = same_time.start_time.clone();
        assert!(same_time.validate().is_ok());
    }

    fn seeded() -> (Arc<LocalTimetableApi>, LecturerSummary, EntityId, EntityId) {
        let api = Arc::new(LocalTimetableApi::new());
        let room = api.add_room("Hall A");
        let stage = api.add_stage("Stage 1");
        let id = api.add_lecturer("Dr. Huda", &[]);
        (api, LecturerSummary::new(id, "Dr. Huda"), room, stage)
    }

    fn fill(
        session: &mut ComposeSession<LocalTimetableApi>,
        lecturer: &LecturerSummary,
        room: &EntityId,
        stage: &EntityId,
    ) {
        let row = session.lecturers().rows()[0];
        session.lecturers().on_select(row, lecturer.clone()).unwrap();
        let draft = session.draft_mut();
        draft.course_name = "Optics".to_string();
        draft.day_of_week = Some(Weekday::Sunday);
        draft.start_time = "09:00".to_string();
        draft.end_time = "10:00".to_string();
        draft.room_id = Some(room.clone());
        draft.stage_id = Some(stage.clone());
    }

    #[tokio::test]
    async fn test_submit_resets_form() {
        let (api, lecturer, room, stage) = seeded();
        let mut session = ComposeSession::new(api.clone(), Duration::from_millis(350), 5);
        fill(&mut session, &lecturer, &room, &stage);

        let notice = session.submit().await.unwrap();
        assert_eq!(notice, Notice::success("Lecture added"));
        assert_eq!(session.draft(), &LectureDraft::default());
        assert_eq!(session.lecturers().rows().len(), 1);
        assert!(session.lecturers().selected_ids().is_empty());
        assert_eq!(api.lectures()[0].lecturer_names().collect::<Vec<_>>(), vec!["Dr. Huda"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lecturer_rows_always_have_options() {
        let (api, lecturer, room, stage) = seeded();
        let mut session = ComposeSession::new(api.clone(), Duration::from_millis(350), 5);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let row = session.lecturers().rows()[0];
        assert_eq!(session.lecturers().current_options(row).unwrap(), vec![lecturer.clone()]);

        let extra = session.lecturers().add_row();
        session.lecturers().remove_row(row).unwrap();
        session.lecturers().remove_row(extra).unwrap();
        assert_eq!(session.lecturers().rows().len(), 1);

        fill(&mut session, &lecturer, &room, &stage);
        session.submit().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let fresh = session.lecturers().rows()[0];
        assert_eq!(session.lecturers().current_options(fresh).unwrap(), vec![lecturer]);
    }

    #[tokio::test]
    async fn test_conflict_message_is_verbatim() {
        let (api, lecturer, room, stage) = seeded();
        let mut session = ComposeSession::new(api.clone(), Duration::from_millis(350), 5);
        fill(&mut session, &lecturer, &room, &stage);
        session.submit().await.unwrap();

        fill(&mut session, &lecturer, &room, &stage);
        let err = session.submit().await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            err.to_string(),
            "Room Hall A is already booked on Sunday at that time"
        );
        assert_eq!(session.draft().course_name, "Optics");
        assert_eq!(api.lectures().len(), 1);
    }
}
