//! Week selection and the per-week lecture snapshot.

use super::presentation::{LayoutConfig, SchedulePresentation};
use super::types::LectureEvent;
use crate::api::{LectureQuery, TimetableApi};
use crate::types::{EntityId, FetchOutcome, Notice};
use chrono::{Datelike, Days, NaiveDate};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

const WIRE_DATE: &str = "%Y-%m-%d";
const LABEL_DATE: &str = "%Y/%m/%d";

/// One stage's schedule for one calendar week. Weeks start on Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeekKey {
    pub stage_id: EntityId,
    pub week_start: NaiveDate,
}

impl WeekKey {
    /// The week containing `date`.
    pub fn for_date(stage_id: impl Into<EntityId>, date: NaiveDate) -> Self {
        let back = u64::from(date.weekday().num_days_from_sunday());
        Self {
            stage_id: stage_id.into(),
            week_start: date - Days::new(back),
        }
    }

    pub fn next(&self) -> Self {
        Self {
            stage_id: self.stage_id.clone(),
            week_start: self.week_start + Days::new(7),
        }
    }

    pub fn prev(&self) -> Self {
        Self {
            stage_id: self.stage_id.clone(),
            week_start: self.week_start - Days::new(7),
        }
    }

    /// Saturday of the same week.
    pub fn week_end(&self) -> NaiveDate {
        self.week_start + Days::new(6)
    }

    /// `(start, end)` as `YYYY-MM-DD`, the form the server expects.
    pub fn date_range(&self) -> (String, String) {
        (
            self.week_start.format(WIRE_DATE).to_string(),
            self.week_end().format(WIRE_DATE).to_string(),
        )
    }

    /// Human-readable range, e.g. `2025/01/05 - 2025/01/11`.
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.week_start.format(LABEL_DATE),
            self.week_end().format(LABEL_DATE)
        )
    }

    pub fn lecture_query(&self) -> LectureQuery {
        LectureQuery {
            stage_id: self.stage_id.clone(),
            start_date: self.week_start,
            end_date: self.week_end(),
        }
    }
}

#[derive(Debug, Default)]
struct WeekState {
    generation: u64,
    key: Option<WeekKey>,
    snapshot: Vec<LectureEvent>,
    notice: Option<Notice>,
    loaded: bool,
}

/// Fetches the lecture snapshot for the selected week.
///
/// Selecting a new week supersedes whatever fetch is still running: its
/// response is dropped when it arrives instead of overwriting the newer
/// week. A failed fetch leaves an empty snapshot plus a notice.
pub struct WeekScheduleLoader<A: ?Sized> {
    api: Arc<A>,
    state: Mutex<WeekState>,
}

impl<A: TimetableApi + ?Sized> WeekScheduleLoader<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: Mutex::new(WeekState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, WeekState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads `key`, returning the number of lectures applied.
    pub async fn load(&self, key: WeekKey) -> FetchOutcome<usize> {
        let generation = {
            let mut state = self.state();
            state.generation += 1;
            state.key = Some(key.clone());
            state.snapshot.clear();
            state.notice = None;
            state.loaded = false;
            state.generation
        };

        let start = Instant::now();
        info!(stage_id = %key.stage_id, week = %key.label(), "Loading week schedule");
        let result = self.api.list_lectures(&key.lecture_query()).await;

        let mut state = self.state();
        if state.generation != generation {
            debug!(
                stage_id = %key.stage_id,
                week = %key.label(),
                "Discarding schedule for superseded week"
            );
            return FetchOutcome::Stale;
        }

        match result {
            Ok(events) => {
                let count = events.len();
                info!(
                    stage_id = %key.stage_id,
                    lectures = count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Week schedule loaded"
                );
                state.snapshot = events;
                state.loaded = true;
                FetchOutcome::Applied(count)
            }
            Err(e) => {
                warn!(stage_id = %key.stage_id, error = %e, "Failed to load week schedule");
                let notice = Notice::error(format!("Failed to load lectures: {e}"));
                state.notice = Some(notice.clone());
                FetchOutcome::Failed(notice)
            }
        }
    }

    /// Re-fetches the current week, e.g. after a lecture was created.
    pub async fn reload(&self) -> Option<FetchOutcome<usize>> {
        let key = self.state().key.clone()?;
        Some(self.load(key).await)
    }

    pub fn current_key(&self) -> Option<WeekKey> {
        self.state().key.clone()
    }

    pub fn snapshot(&self) -> Vec<LectureEvent> {
        self.state().snapshot.clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.state().notice.clone()
    }

    /// Grid, timeline and print data for the current snapshot.
    pub fn presentation(&self, query: &str, layout: &LayoutConfig) -> SchedulePresentation {
        SchedulePresentation::build(&self.state().snapshot, query, layout)
    }

    /// True once the current week loaded successfully with at least one lecture.
    pub fn can_print(&self) -> bool {
        let state = self.state();
        state.loaded && !state.snapshot.is_empty()
    }
}
