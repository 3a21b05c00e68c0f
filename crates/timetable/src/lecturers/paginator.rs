//! Cursor-driven paging over the lecturer directory.

use super::types::{Cursor, LecturerQuery, LecturerSummary, PageWindow};
use crate::api::{ApiResult, Resource, TimetableApi};
use crate::schedule::Weekday;
use crate::types::EntityId;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Walks the lecturer directory one page at a time.
///
/// The paginator only ever sends back cursors the server handed out; it
/// never derives an offset from the page size. Nothing is cached between
/// pages, so every navigation is a fresh request.
pub struct CursorPaginator<A: ?Sized> {
    api: Arc<A>,
    limit: u32,
    /// Cursor that produced `current`; `None` for the first page.
    cursor: Option<Cursor>,
    current: Option<PageWindow>,
}

impl<A: TimetableApi + ?Sized> CursorPaginator<A> {
    pub fn new(api: Arc<A>, limit: u32) -> Self {
        Self {
            api,
            limit: limit.max(1),
            cursor: None,
            current: None,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn current(&self) -> Option<&PageWindow> {
        self.current.as_ref()
    }

    /// Fetches the page `cursor` points at and makes it current.
    ///
    /// On failure the current page becomes empty, but the cursor is kept
    /// so [`reload`](Self::reload) retries the same page.
    pub async fn fetch_page(
        &mut self,
        limit: u32,
        cursor: Option<Cursor>,
    ) -> ApiResult<PageWindow> {
        let limit = limit.max(1);
        debug!(limit, cursor = ?cursor, "Fetching lecturer page");

        self.limit = limit;
        self.cursor = cursor.clone();
        match self.api.list_lecturers(&LecturerQuery::page(limit, cursor)).await {
            Ok(page) => {
                self.current = Some(page.clone());
                Ok(page)
            }
            Err(e) => {
                warn!(limit, error = %e, "Failed to load lecturer page");
                self.current = Some(PageWindow {
                    items: Vec::new(),
                    next: None,
                    prev: None,
                    limit,
                });
                Err(e)
            }
        }
    }

    pub async fn first_page(&mut self) -> ApiResult<PageWindow> {
        self.fetch_page(self.limit, None).await
    }

    pub fn has_next(&self) -> bool {
        self.current.as_ref().is_some_and(|p| p.next.is_some())
    }

    pub fn has_prev(&self) -> bool {
        self.current.as_ref().is_some_and(|p| p.prev.is_some())
    }

    /// Moves forward one page; `Ok(None)` on the last page.
    pub async fn next_page(&mut self) -> ApiResult<Option<PageWindow>> {
        let Some(next) = self.current.as_ref().and_then(|p| p.next.clone()) else {
            return Ok(None);
        };
        self.fetch_page(self.limit, Some(next)).await.map(Some)
    }

    /// Moves back one page; `Ok(None)` on the first page.
    pub async fn prev_page(&mut self) -> ApiResult<Option<PageWindow>> {
        let Some(prev) = self.current.as_ref().and_then(|p| p.prev.clone()) else {
            return Ok(None);
        };
        self.fetch_page(self.limit, Some(prev)).await.map(Some)
    }

    /// Changes the page size and starts over from the first page.
    pub async fn set_limit(&mut self, limit: u32) -> ApiResult<PageWindow> {
        self.fetch_page(limit, None).await
    }

    /// Re-requests the current page with the cursor that produced it.
    pub async fn reload(&mut self) -> ApiResult<PageWindow> {
        self.fetch_page(self.limit, self.cursor.clone()).await
    }

    /// Lecturers on the current page whose name contains `query`, ignoring case.
    pub fn visible(&self, query: &str) -> Vec<&LecturerSummary> {
        let needle = query.trim().to_lowercase();
        self.current
            .iter()
            .flat_map(|page| page.items.iter())
            .filter(|l| needle.is_empty() || l.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Deletes a lecturer, then reloads the current page.
    pub async fn delete_lecturer(&mut self, id: &EntityId) -> ApiResult<PageWindow> {
        self.api.delete(Resource::Lecturer, id).await?;
        info!(lecturer_id = %id, "Lecturer deleted");
        self.reload().await
    }

    /// Replaces a lecturer's days off, then reloads the current page.
    pub async fn update_day_offs(
        &mut self,
        id: &EntityId,
        day_offs: &[Weekday],
    ) -> ApiResult<PageWindow> {
        self.api.update_day_offs(id, day_offs).await?;
        info!(lecturer_id = %id, days = day_offs.len(), "Lecturer days off updated");
        self.reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, LocalTimetableApi};

    fn directory(count: usize) -> (Arc<LocalTimetableApi>, Vec<EntityId>) {
        let api = Arc::new(LocalTimetableApi::new());
        let ids = (0..count)
            .map(|i| api.add_lecturer(&format!("Lecturer {i:02}"), &[]))
            .collect();
        (api, ids)
    }

    #[tokio::test]
    async fn test_prev_of_second_page_is_first_page() {
        let (api, _) = directory(12);
        let mut pager = CursorPaginator::new(api, 5);

        let p1 = pager.fetch_page(5, None).await.unwrap();
        let p2 = pager.fetch_page(5, p1.next.clone()).await.unwrap();
        let back = pager.fetch_page(5, p2.prev.clone()).await.unwrap();

        assert_eq!(back, p1);
        assert_ne!(p1.items, p2.items);
    }

    #[tokio::test]
    async fn test_navigation_stops_at_the_ends() {
        let (api, _) = directory(7);
        let mut pager = CursorPaginator::new(api.clone(), 5);

        pager.first_page().await.unwrap();
        assert!(!pager.has_prev());
        assert!(pager.prev_page().await.unwrap().is_none());

        let last = pager.next_page().await.unwrap().unwrap();
        assert_eq!(last.items.len(), 2);
        assert!(!pager.has_next());
        assert!(pager.next_page().await.unwrap().is_none());

        // Disabled directions never reach the server.
        assert_eq!(api.lecturer_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_page_size_change_restarts_at_first_page() {
        let (api, _) = directory(12);
        let mut pager = CursorPaginator::new(api.clone(), 5);
        pager.first_page().await.unwrap();
        pager.next_page().await.unwrap();
        assert!(pager.has_prev());

        let page = pager.set_limit(10).await.unwrap();
        assert!(page.is_first());
        assert_eq!(page.items.len(), 10);
        assert_eq!(api.lecturer_requests().last().unwrap().cursor, None);
    }

    #[tokio::test]
    async fn test_mutations_reload_current_page() {
        let (api, ids) = directory(7);
        let mut pager = CursorPaginator::new(api.clone(), 5);
        pager.first_page().await.unwrap();
        pager.next_page().await.unwrap();

        let page = pager.delete_lecturer(&ids[6]).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Lecturer 05");

        let page = pager
            .update_day_offs(&ids[5], &[Weekday::Sunday, Weekday::Monday])
            .await
            .unwrap();
        assert_eq!(page.items[0].available_days().len(), 3);
    }

    #[tokio::test]
    async fn test_visible_filters_current_page_only() {
        let api = Arc::new(LocalTimetableApi::new());
        api.add_lecturer("Dr. Huda", &[]);
        api.add_lecturer("Dr. Salim", &[]);
        let mut pager = CursorPaginator::new(api, 5);
        pager.first_page().await.unwrap();

        assert_eq!(pager.visible("").len(), 2);
        let names: Vec<&str> = pager.visible("HUDA").iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Dr. Huda"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_empties_page() {
        let (api, _) = directory(3);
        let mut pager = CursorPaginator::new(api.clone(), 5);
        pager.first_page().await.unwrap();

        api.fail_next_request(ApiError::Network {
            message: "timeout".to_string(),
        });
        assert!(pager.reload().await.is_err());
        assert!(pager.current().unwrap().items.is_empty());

        assert_eq!(pager.reload().await.unwrap().items.len(), 3);
    }
}
