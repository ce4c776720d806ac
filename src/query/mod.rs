//! Query state store.
//!
//! Holds what a list view currently wants to see: page, page size, filters,
//! and the epoch that identifies the generation of that wish. Every
//! transition that should invalidate in-flight requests bumps the epoch.

mod filters;
mod page_size;

use std::fmt;

pub use filters::{DateRange, FilterValue, Filters, RANGE_BEGIN_PARAM, RANGE_END_PARAM};
pub use page_size::{DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZES, PageSizeOptions};

use crate::error::{BackofficeError, Result};

/// Generation counter of a query state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(u64);

impl Epoch {
    pub const ZERO: Epoch = Epoch(0);

    pub fn new(value: u64) -> Self {
        Epoch(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Epoch(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Snapshot of what should currently be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
    pub filters: Filters,
    pub epoch: Epoch,
}

impl QueryState {
    fn initial(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size,
            filters: Filters::new(),
            epoch: Epoch::ZERO,
        }
    }
}

/// Single authoritative holder of a view's query state.
#[derive(Debug, Clone)]
pub struct QueryStore {
    state: QueryState,
    options: PageSizeOptions,
}

impl QueryStore {
    /// Page 1, the default page size, no filters, epoch zero.
    pub fn new(options: PageSizeOptions) -> Self {
        Self {
            state: QueryState::initial(options.default_page_size),
            options,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn epoch(&self) -> Epoch {
        self.state.epoch
    }

    pub fn options(&self) -> &PageSizeOptions {
        &self.options
    }

    /// Replace the whole filter mapping and go back to the first page.
    ///
    /// Always a transition, so re-submitting the current filters refreshes.
    pub fn set_filters(&mut self, filters: Filters) -> Epoch {
        self.state.filters = filters;
        self.state.page = 1;
        self.bump()
    }

    /// Move to page `page`. Returns `None` when already on that page.
    ///
    /// Pages past the end are accepted; the store does not know the total count.
    pub fn set_page(&mut self, page: u32) -> Result<Option<Epoch>> {
        if page == 0 {
            return Err(BackofficeError::ValidationFailure(
                "page numbers start at 1".to_string(),
            ));
        }
        if page == self.state.page {
            return Ok(None);
        }
        self.state.page = page;
        Ok(Some(self.bump()))
    }

    /// Change the page size, keeping the page. Returns `None` when unchanged.
    pub fn set_page_size(&mut self, size: u32) -> Result<Option<Epoch>> {
        let size = self.options.check(size)?;
        if size == self.state.page_size {
            return Ok(None);
        }
        self.state.page_size = size;
        Ok(Some(self.bump()))
    }

    /// Invalidate in-flight requests without changing any parameter.
    pub fn refresh(&mut self) -> Epoch {
        self.bump()
    }

    fn bump(&mut self) -> Epoch {
        self.state.epoch = self.state.epoch.next();
        self.state.epoch
    }
}

impl Default for QueryStore {
    fn default() -> Self {
        Self::new(PageSizeOptions::default())
    }
}
