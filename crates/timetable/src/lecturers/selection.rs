//! Debounced lecturer lookup for the rows of the compose form.
//!
//! Each lecturer row searches on its own: keystrokes re-arm a per-row
//! debounce timer, and when it fires the row's previous request is aborted
//! and a new one is issued with a higher sequence number. A response is only
//! applied if it carries the row's latest sequence number, so a slow reply
//! for "a" can never overwrite the results for "ab".
//!
//! A new row immediately looks up the unfiltered list so its dropdown is
//! never empty before the first keystroke.

use super::types::{LecturerQuery, LecturerSummary};
use crate::api::{ApiResult, TimetableApi};
use crate::types::{EntityId, Notice};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Identifier of one lecturer row in the form.
pub type RowId = u64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Unknown lecturer row {0}")]
    UnknownRow(RowId),
}

/// Lecturers that were picked in some row, keyed by id.
///
/// Only written when a row commits a choice and only emptied on session
/// reset; lookups read it so a row keeps showing its selection after the
/// search text moves on.
#[derive(Debug, Clone, Default)]
pub struct SelectionCache {
    entries: Arc<DashMap<EntityId, LecturerSummary>>,
}

impl SelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, lecturer: LecturerSummary) {
        self.entries.insert(lecturer.id.clone(), lecturer);
    }

    pub fn get(&self, id: &EntityId) -> Option<LecturerSummary> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where a row is in its lookup cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPhase {
    Idle,
    /// A keystroke arrived; the debounce timer is running.
    Pending,
    /// A lookup is on the wire.
    Inflight,
}

/// Search state of a single row, without the tasks driving it.
#[derive(Debug, Clone)]
pub struct RowSearchState {
    query: String,
    selected: Option<EntityId>,
    results: Vec<LecturerSummary>,
    notice: Option<Notice>,
    phase: RowPhase,
    seq: u64,
}

impl Default for RowSearchState {
    fn default() -> Self {
        Self {
            query: String::new(),
            selected: None,
            results: Vec::new(),
            notice: None,
            phase: RowPhase::Idle,
            seq: 0,
        }
    }
}

impl RowSearchState {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn phase(&self) -> RowPhase {
        self.phase
    }

    pub fn results(&self) -> &[LecturerSummary] {
        &self.results
    }

    pub fn selected(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Records a keystroke.
    pub fn type_query(&mut self, text: &str) {
        self.query = text.to_string();
        self.phase = RowPhase::Pending;
    }

    /// Issues a new request number; older ones become stale.
    pub fn begin_request(&mut self) -> u64 {
        self.seq += 1;
        self.phase = RowPhase::Inflight;
        self.seq
    }

    /// Applies the response to request `seq`. Returns false, leaving the row
    /// untouched, if a newer request has been issued since.
    pub fn accept(&mut self, seq: u64, result: ApiResult<Vec<LecturerSummary>>) -> bool {
        if seq != self.seq {
            return false;
        }
        match result {
            Ok(items) => {
                self.results = items;
                self.notice = None;
            }
            Err(e) => {
                self.results.clear();
                self.notice = Some(Notice::error(format!("Lecturer search failed: {e}")));
            }
        }
        if self.phase == RowPhase::Inflight {
            self.phase = RowPhase::Idle;
        }
        true
    }

    /// The committed selection first, then the latest results, without
    /// repeating an id.
    pub fn options(&self, cache: &SelectionCache) -> Vec<LecturerSummary> {
        let committed = self.selected.as_ref().and_then(|id| cache.get(id));
        let mut seen = HashSet::new();
        committed
            .into_iter()
            .chain(self.results.iter().cloned())
            .filter(|l| seen.insert(l.id.clone()))
            .collect()
    }
}

#[derive(Default)]
struct RowSlot {
    state: RowSearchState,
    timer: Option<JoinHandle<()>>,
    /// Bumped every time the timer is re-armed.
    timer_epoch: u64,
    inflight: Option<JoinHandle<()>>,
}

impl RowSlot {
    fn abort_tasks(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(inflight) = self.inflight.take() {
            inflight.abort();
        }
    }
}

struct Shared<A: ?Sized> {
    api: Arc<A>,
    rows: DashMap<RowId, RowSlot>,
    cache: SelectionCache,
    debounce: Duration,
    limit: u32,
}

impl<A: TimetableApi + ?Sized + 'static> Shared<A> {
    /// Debounce timer `epoch` expired. A timer re-armed since then is
    /// ignored, leaving the newer handle in place.
    fn fire(self: &Arc<Self>, row: RowId, epoch: u64) {
        let Some(mut slot) = self.rows.get_mut(&row) else {
            return;
        };
        if slot.timer_epoch != epoch {
            debug!(row, epoch, latest = slot.timer_epoch, "Ignoring superseded debounce timer");
            return;
        }
        slot.timer = None;
        self.issue(row, &mut slot);
    }

    /// Cancels the row's previous request and sends a new one for its text.
    fn issue(self: &Arc<Self>, row: RowId, slot: &mut RowSlot) {
        if let Some(previous) = slot.inflight.take() {
            previous.abort();
        }

        let seq = slot.state.begin_request();
        let query = LecturerQuery::search(slot.state.query(), self.limit);
        debug!(row, seq, search = ?query.search, "Issuing lecturer lookup");

        let shared = Arc::clone(self);
        slot.inflight = Some(tokio::spawn(async move {
            let result = shared.api.list_lecturers(&query).await;
            shared.complete(row, seq, result.map(|page| page.items));
        }));
    }

    fn complete(&self, row: RowId, seq: u64, result: ApiResult<Vec<LecturerSummary>>) {
        let Some(mut slot) = self.rows.get_mut(&row) else {
            debug!(row, seq, "Dropping lookup for removed row");
            return;
        };
        if let Err(e) = &result {
            warn!(row, seq, error = %e, "Lecturer lookup failed");
        }
        if slot.state.accept(seq, result) {
            slot.inflight = None;
            debug!(row, seq, results = slot.state.results().len(), "Lecturer lookup applied");
        } else {
            debug!(row, seq, latest = slot.state.seq, "Discarding stale lecturer lookup");
        }
    }
}

/// All lecturer rows of one compose form.
///
/// Methods that start a lookup spawn onto the current Tokio runtime.
/// Dropping the container aborts every timer and request it started.
pub struct LecturerSelection<A: ?Sized> {
    shared: Arc<Shared<A>>,
    next_row: AtomicU64,
}

impl<A: TimetableApi + ?Sized + 'static> LecturerSelection<A> {
    pub fn new(api: Arc<A>, debounce: Duration, limit: u32) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                rows: DashMap::new(),
                cache: SelectionCache::new(),
                debounce,
                limit: limit.max(1),
            }),
            next_row: AtomicU64::new(1),
        }
    }

    pub fn cache(&self) -> &SelectionCache {
        &self.shared.cache
    }

    /// Appends an empty row and starts its unfiltered lookup.
    pub fn add_row(&self) -> RowId {
        let row = self.next_row.fetch_add(1, Ordering::Relaxed);
        let mut slot = self.shared.rows.entry(row).or_default();
        self.shared.issue(row, &mut slot);
        row
    }

    /// Removes a row, cancelling its timer and any lookup in flight.
    ///
    /// The form always keeps one row: removing the last one replaces it
    /// with a fresh, unselected row.
    pub fn remove_row(&self, row: RowId) -> Result<(), SelectionError> {
        let (_, mut slot) = self
            .shared
            .rows
            .remove(&row)
            .ok_or(SelectionError::UnknownRow(row))?;
        slot.abort_tasks();
        if self.shared.rows.is_empty() {
            let fresh = self.add_row();
            debug!(row, fresh, "Replaced the last lecturer row");
        }
        Ok(())
    }

    /// Row ids in the order the rows were added.
    pub fn rows(&self) -> Vec<RowId> {
        let mut rows: Vec<RowId> = self.shared.rows.iter().map(|entry| *entry.key()).collect();
        rows.sort_unstable();
        rows
    }

    /// Records new search text and (re)starts the row's debounce timer.
    pub fn on_query_change(&self, row: RowId, text: &str) -> Result<(), SelectionError> {
        let mut slot = self
            .shared
            .rows
            .get_mut(&row)
            .ok_or(SelectionError::UnknownRow(row))?;
        slot.state.type_query(text);
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        slot.timer_epoch += 1;

        let epoch = slot.timer_epoch;
        let shared = Arc::clone(&self.shared);
        let debounce = self.shared.debounce;
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            shared.fire(row, epoch);
        }));
        Ok(())
    }

    /// Commits `lecturer` as the row's choice.
    pub fn on_select(&self, row: RowId, lecturer: LecturerSummary) -> Result<(), SelectionError> {
        let mut slot = self
            .shared
            .rows
            .get_mut(&row)
            .ok_or(SelectionError::UnknownRow(row))?;
        info!(row, lecturer_id = %lecturer.id, "Lecturer selected");
        slot.state.selected = Some(lecturer.id.clone());
        self.shared.cache.insert(lecturer);
        Ok(())
    }

    pub fn clear_selection(&self, row: RowId) -> Result<(), SelectionError> {
        let mut slot = self
            .shared
            .rows
            .get_mut(&row)
            .ok_or(SelectionError::UnknownRow(row))?;
        slot.state.selected = None;
        Ok(())
    }

    /// What the row's dropdown shows: its selection, then the latest results.
    pub fn current_options(&self, row: RowId) -> Result<Vec<LecturerSummary>, SelectionError> {
        self.with_state(row, |state| state.options(&self.shared.cache))
    }

    pub fn phase(&self, row: RowId) -> Result<RowPhase, SelectionError> {
        self.with_state(row, RowSearchState::phase)
    }

    pub fn selected(&self, row: RowId) -> Result<Option<EntityId>, SelectionError> {
        self.with_state(row, |state| state.selected().cloned())
    }

    pub fn notice(&self, row: RowId) -> Result<Option<Notice>, SelectionError> {
        self.with_state(row, |state| state.notice().cloned())
    }

    /// Selected lecturer ids in row order; rows without a choice are skipped.
    pub fn selected_ids(&self) -> Vec<EntityId> {
        self.rows()
            .into_iter()
            .filter_map(|row| self.selected(row).ok().flatten())
            .collect()
    }

    /// Drops every row and the selection cache, cancelling all lookups, and
    /// starts over with one empty row.
    pub fn reset(&self) -> RowId {
        let rows = self.rows();
        for row in rows {
            if let Some((_, mut slot)) = self.shared.rows.remove(&row) {
                slot.abort_tasks();
            }
        }
        self.shared.cache.clear();
        self.add_row()
    }

    fn with_state<T>(
        &self,
        row: RowId,
        f: impl FnOnce(&RowSearchState) -> T,
    ) -> Result<T, SelectionError> {
        let slot = self
            .shared
            .rows
            .get(&row)
            .ok_or(SelectionError::UnknownRow(row))?;
        Ok(f(&slot.state))
    }
}

impl<A: ?Sized> Drop for LecturerSelection<A> {
    fn drop(&mut self) {
        for mut slot in self.shared.rows.iter_mut() {
            slot.abort_tasks();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, LocalTimetableApi};

    const DEBOUNCE: Duration = Duration::from_millis(350);

    fn lecturer(id: i64, name: &str) -> LecturerSummary {
        LecturerSummary::new(id, name)
    }

    fn names(options: &[LecturerSummary]) -> Vec<&str> {
        options.iter().map(|l| l.name.as_str()).collect()
    }

    fn directory() -> Arc<LocalTimetableApi> {
        let api = Arc::new(LocalTimetableApi::new());
        for name in ["Ahmad", "Abbas", "Zainab", "Dr. Huda", "Dr. Salim"] {
            api.add_lecturer(name, &[]);
        }
        api
    }

    async fn settle(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[test]
    fn test_older_response_is_discarded() {
        let mut state = RowSearchState::default();
        state.type_query("a");
        let first = state.begin_request();
        state.type_query("ab");
        let second = state.begin_request();

        assert!(state.accept(second, Ok(vec![lecturer(2, "Abbas")])));
        assert!(!state.accept(first, Ok(vec![lecturer(1, "Ahmad"), lecturer(2, "Abbas")])));
        assert_eq!(names(state.results()), vec!["Abbas"]);
        assert_eq!(state.phase(), RowPhase::Idle);
    }

    #[test]
    fn test_options_put_selection_first_without_duplicates() {
        let cache = SelectionCache::new();
        cache.insert(lecturer(1, "Dr. Huda"));
        let mut state = RowSearchState::default();
        state.selected = Some(EntityId::Int(1));
        let seq = state.begin_request();
        state.accept(seq, Ok(vec![lecturer(2, "Dr. Salim"), lecturer(1, "Dr. Huda")]));

        assert_eq!(names(&state.options(&cache)), vec!["Dr. Huda", "Dr. Salim"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_are_debounced() {
        let api = directory();
        let selection = LecturerSelection::new(api.clone(), DEBOUNCE, 5);
        let row = selection.add_row();
        settle(10).await;

        for text in ["d", "dr", "dr."] {
            selection.on_query_change(row, text).unwrap();
            settle(100).await;
        }
        assert_eq!(selection.phase(row).unwrap(), RowPhase::Pending);
        assert_eq!(api.lecturer_requests().len(), 1);

        settle(400).await;
        let requests = api.lecturer_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].search.as_deref(), Some("dr."));
        assert_eq!(selection.phase(row).unwrap(), RowPhase::Idle);
        assert_eq!(
            names(&selection.current_options(row).unwrap()),
            vec!["Dr. Huda", "Dr. Salim"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_query_wins_over_slow_response() {
        let api = directory();
        api.set_search_latency("a", Duration::from_millis(1_000));
        let selection = LecturerSelection::new(api.clone(), DEBOUNCE, 5);
        let row = selection.add_row();

        selection.on_query_change(row, "a").unwrap();
        settle(400).await;
        assert_eq!(selection.phase(row).unwrap(), RowPhase::Inflight);

        selection.on_query_change(row, "ab").unwrap();
        settle(2_000).await;

        assert_eq!(api.lecturer_requests().len(), 3);
        assert_eq!(
            names(&selection.current_options(row).unwrap()),
            vec!["Abbas", "Zainab"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_survives_query_change() {
        let api = directory();
        let selection = LecturerSelection::new(api.clone(), DEBOUNCE, 5);
        let row = selection.add_row();

        selection.on_query_change(row, "huda").unwrap();
        settle(400).await;
        let huda = selection.current_options(row).unwrap().remove(0);
        selection.on_select(row, huda.clone()).unwrap();

        selection.on_query_change(row, "salim").unwrap();
        settle(400).await;
        assert_eq!(
            names(&selection.current_options(row).unwrap()),
            vec!["Dr. Huda", "Dr. Salim"]
        );
        assert_eq!(selection.selected_ids(), vec![huda.id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rows_search_independently() {
        let api = directory();
        api.set_search_latency("a", Duration::from_millis(600));
        let selection = LecturerSelection::new(api.clone(), DEBOUNCE, 5);
        let first = selection.add_row();
        let second = selection.add_row();

        selection.on_query_change(first, "a").unwrap();
        settle(400).await;
        // Issuing a lookup in another row must not cancel the first one.
        selection.on_query_change(second, "zain").unwrap();
        settle(1_000).await;

        assert_eq!(
            names(&selection.current_options(first).unwrap()),
            vec!["Ahmad", "Abbas", "Zainab", "Dr. Huda", "Dr. Salim"]
        );
        assert_eq!(
            names(&selection.current_options(second).unwrap()),
            vec!["Zainab"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_row_cancels_lookup() {
        let api = directory();
        api.set_search_latency("a", Duration::from_millis(1_000));
        let selection = LecturerSelection::new(api.clone(), DEBOUNCE, 5);
        let row = selection.add_row();
        let keep = selection.add_row();

        selection.on_query_change(row, "a").unwrap();
        settle(400).await;
        selection.remove_row(row).unwrap();
        settle(2_000).await;

        assert_eq!(selection.rows(), vec![keep]);
        assert_eq!(
            selection.on_query_change(row, "ab"),
            Err(SelectionError::UnknownRow(row))
        );
        assert!(selection.current_options(row).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_lookup_shows_nothing() {
        let api = directory();
        let selection = LecturerSelection::new(api.clone(), DEBOUNCE, 5);
        let row = selection.add_row();
        settle(10).await;
        assert_eq!(selection.current_options(row).unwrap().len(), 5);

        api.fail_next_request(ApiError::Network {
            message: "offline".to_string(),
        });
        selection.on_query_change(row, "dr").unwrap();
        settle(400).await;

        assert!(selection.current_options(row).unwrap().is_empty());
        assert!(selection.notice(row).unwrap().is_some());
        assert_eq!(api.lecturer_requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_starts_with_one_empty_row() {
        let api = directory();
        let selection = LecturerSelection::new(api, DEBOUNCE, 5);
        let row = selection.add_row();
        selection.on_select(row, lecturer(9, "Dr. Huda")).unwrap();
        selection.add_row();

        let fresh = selection.reset();
        assert_eq!(selection.rows(), vec![fresh]);
        assert!(selection.selected_ids().is_empty());
        assert!(selection.cache().is_empty());

        settle(10).await;
        assert_eq!(selection.current_options(fresh).unwrap().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_row_loads_lecturers() {
        let api = directory();
        let selection = LecturerSelection::new(api.clone(), DEBOUNCE, 5);
        let first = selection.add_row();
        assert_eq!(selection.phase(first).unwrap(), RowPhase::Inflight);
        settle(10).await;

        assert_eq!(selection.phase(first).unwrap(), RowPhase::Idle);
        assert_eq!(
            names(&selection.current_options(first).unwrap()),
            vec!["Ahmad", "Abbas", "Zainab", "Dr. Huda", "Dr. Salim"]
        );

        let second = selection.add_row();
        settle(10).await;
        assert_eq!(selection.current_options(second).unwrap().len(), 5);

        let requests = api.lecturer_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|q| q.search.is_none() && q.limit == 5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_removing_last_row_leaves_a_fresh_one() {
        let api = directory();
        let selection = LecturerSelection::new(api, DEBOUNCE, 5);
        let row = selection.add_row();
        selection.on_select(row, lecturer(4, "Dr. Huda")).unwrap();

        selection.remove_row(row).unwrap();
        let rows = selection.rows();
        assert_eq!(rows.len(), 1);
        assert_ne!(rows[0], row);
        assert_eq!(selection.selected(rows[0]).unwrap(), None);
        assert!(selection.selected_ids().is_empty());

        settle(10).await;
        assert_eq!(selection.current_options(rows[0]).unwrap().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_timer_does_not_fire() {
        let api = directory();
        let selection = LecturerSelection::new(api.clone(), DEBOUNCE, 5);
        let row = selection.add_row();
        settle(10).await;

        selection.on_query_change(row, "d").unwrap();
        selection.on_query_change(row, "dr").unwrap();
        // The first keystroke's timer waking up after being re-armed.
        selection.shared.fire(row, 1);
        assert_eq!(selection.phase(row).unwrap(), RowPhase::Pending);
        assert_eq!(api.lecturer_requests().len(), 1);

        settle(400).await;
        let requests = api.lecturer_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].search.as_deref(), Some("dr"));
        assert_eq!(selection.phase(row).unwrap(), RowPhase::Idle);
    }
}
