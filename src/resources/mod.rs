//! The backoffice collections: tickets and categories.

pub mod categories;
pub mod tickets;

use std::sync::Arc;

use tokio::task::JoinHandle;

pub use categories::CategoryDesk;
pub use tickets::{SortOrder, TicketDesk, TicketFilter, TicketKind};

use crate::backend::{Record, ResourceList};
use crate::error::Result;
use crate::query::{Filters, PageSizeOptions, QueryStore};
use crate::session::{ListHandle, ListSession};

/// Where a list view opens.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOpening {
    pub filters: Filters,
    pub page: u32,
    /// `None` keeps the configured default
    pub page_size: Option<u32>,
}

impl Default for ListOpening {
    fn default() -> Self {
        Self {
            filters: Filters::new(),
            page: 1,
            page_size: None,
        }
    }
}

impl ListOpening {
    /// Store positioned at this opening; validation errors surface here,
    /// before any request is made.
    pub fn store(&self, options: PageSizeOptions) -> Result<QueryStore> {
        let mut store = QueryStore::new(options);
        store.set_filters(self.filters.clone());
        store.set_page(self.page)?;
        if let Some(size) = self.page_size {
            store.set_page_size(size)?;
        }
        Ok(store)
    }
}

pub(crate) fn spawn_list(
    source: ResourceList,
    options: PageSizeOptions,
    opening: &ListOpening,
) -> Result<(ListHandle<Record>, JoinHandle<()>)> {
    let store = opening.store(options)?;
    Ok(ListSession::spawn(Arc::new(source), store))
}

/// Apply a record returned by an update to the matching row of `list`.
pub async fn apply_update(list: &ListHandle<Record>, id: &str, updated: Record) -> Result<bool> {
    list.patch_item(id, move |row: &mut Record| row.apply_update(updated))
        .await
}
