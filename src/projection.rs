//! Pure projection of controller state into what a list view renders.

use crate::fetch::{ControllerState, Status};

/// 1-based "from-to of total" window shown under a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayedRange {
    pub from: u64,
    pub to: u64,
    pub total: u64,
}

/// Renderable list state. Derived only, never mutated directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    pub rows: Vec<T>,
    pub total_count: u64,
    /// Effective page size of the accepted result
    pub page_size: Option<u32>,
    /// Page the accepted result was requested for
    pub page: Option<u32>,
    pub total_pages: u32,
    /// `None` when there is nothing to show on the accepted page
    pub displayed_range: Option<DisplayedRange>,
    pub status: Status,
    pub is_loading: bool,
    pub is_empty: bool,
    pub error_message: Option<String>,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            total_count: 0,
            page_size: None,
            page: None,
            total_pages: 0,
            displayed_range: None,
            status: Status::Idle,
            is_loading: false,
            is_empty: false,
            error_message: None,
        }
    }
}

impl<T> ListView<T> {
    /// Whether the accepted page lies beyond the last page of the result set.
    pub fn is_past_end(&self) -> bool {
        matches!(self.page, Some(page) if page > self.total_pages.max(1))
    }
}

/// Number of pages needed for `total_count` records; a zero size counts as 1.
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total_count.div_ceil(size);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Rows shown on `page`, or `None` when the page is empty or past the end.
pub fn displayed_range(page: u32, page_size: u32, total_count: u64) -> Option<DisplayedRange> {
    if page == 0 || total_count == 0 {
        return None;
    }
    let size = u64::from(page_size.max(1));
    let from = u64::from(page - 1).saturating_mul(size).saturating_add(1);
    if from > total_count {
        return None;
    }
    let to = u64::from(page).saturating_mul(size).min(total_count);
    Some(DisplayedRange {
        from,
        to,
        total: total_count,
    })
}

pub fn project<T: Clone>(state: &ControllerState<T>) -> ListView<T> {
    let accepted = state.last_accepted.as_ref();

    let rows = accepted.map(|r| r.items.clone()).unwrap_or_default();
    let total_count = accepted.map(|r| r.total_count).unwrap_or(0);
    let page_size = accepted.map(|r| r.effective_page_size);
    let page = accepted.map(|r| r.page);
    let total_pages = accepted
        .map(|r| total_pages(r.total_count, r.effective_page_size))
        .unwrap_or(0);
    let displayed_range =
        accepted.and_then(|r| displayed_range(r.page, r.effective_page_size, r.total_count));

    let is_empty = state.status == Status::Success && rows.is_empty();
    let error_message = match state.status {
        Status::Error => state.last_error.as_ref().map(|e| e.to_string()),
        _ => None,
    };

    ListView {
        rows,
        total_count,
        page_size,
        page,
        total_pages,
        displayed_range,
        status: state.status,
        is_loading: state.status == Status::Loading,
        is_empty,
        error_message,
    }
}
