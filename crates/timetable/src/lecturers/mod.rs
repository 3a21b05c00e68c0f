//! Lecturer directory: cursor paging for the management screen and
//! debounced per-row lookup for the compose form.

mod paginator;
mod selection;
mod types;

pub use paginator::CursorPaginator;
pub use selection::{
    LecturerSelection, RowId, RowPhase, RowSearchState, SelectionCache, SelectionError,
};
pub use types::{Cursor, LecturerQuery, LecturerSummary, NewLecturer, PageWindow};
