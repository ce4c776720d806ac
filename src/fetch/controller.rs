use crate::error::Result;
use crate::projection::{ListView, project, total_pages};
use crate::query::{Filters, PageSizeOptions, QueryState, QueryStore};

use super::{ControllerState, FetchCoordinator, FetchRequest, FetchResponse, Identified, Settlement};

/// One list view's query store and fetch coordinator.
///
/// Every intent that changes the query returns the request to send; intents
/// that change nothing return `None` and must not trigger a fetch.
#[derive(Debug, Clone)]
pub struct ListController<T> {
    store: QueryStore,
    coordinator: FetchCoordinator<T>,
}

impl<T> ListController<T> {
    pub fn new(options: PageSizeOptions) -> Self {
        Self::with_store(QueryStore::new(options))
    }

    /// Start from a store the caller already prepared (initial filters, page).
    pub fn with_store(store: QueryStore) -> Self {
        Self {
            store,
            coordinator: FetchCoordinator::new(),
        }
    }

    pub fn query(&self) -> &QueryState {
        self.store.state()
    }

    pub fn state(&self) -> &ControllerState<T> {
        self.coordinator.state()
    }

    /// Initial fetch when the view opens.
    pub fn start(&mut self) -> FetchRequest {
        self.refresh()
    }

    pub fn set_filters(&mut self, filters: Filters) -> FetchRequest {
        self.store.set_filters(filters);
        self.issue()
    }

    pub fn set_page(&mut self, page: u32) -> Result<Option<FetchRequest>> {
        Ok(self.store.set_page(page)?.map(|_| self.issue()))
    }

    pub fn set_page_size(&mut self, size: u32) -> Result<Option<FetchRequest>> {
        Ok(self.store.set_page_size(size)?.map(|_| self.issue()))
    }

    /// Refetch the current query, superseding anything in flight.
    pub fn refresh(&mut self) -> FetchRequest {
        self.store.refresh();
        self.issue()
    }

    /// Move back onto the last page the accepted total count allows.
    ///
    /// No-op until a result has been accepted, or when the page is in range.
    pub fn clamp_page(&mut self) -> Result<Option<FetchRequest>> {
        let Some(accepted) = self.coordinator.state().last_accepted.as_ref() else {
            return Ok(None);
        };
        let last_page = total_pages(accepted.total_count, accepted.effective_page_size).max(1);
        if self.store.state().page <= last_page {
            return Ok(None);
        }
        self.set_page(last_page)
    }

    /// Hand a response to the coordinator, checked against the store's epoch now.
    pub fn settle(&mut self, response: FetchResponse<T>) -> Settlement {
        self.coordinator.settle(self.store.epoch(), response)
    }

    fn issue(&mut self) -> FetchRequest {
        self.coordinator.issue(self.store.state())
    }
}

impl<T: Identified> ListController<T> {
    pub fn patch_item<F>(&mut self, id: &str, patch: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        self.coordinator.patch_item(id, patch)
    }
}

impl<T: Clone> ListController<T> {
    pub fn view(&self) -> ListView<T> {
        project(self.coordinator.state())
    }
}
