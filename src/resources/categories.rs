//! Article categories.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::backend::{BackendClient, ListResource, Record, ResourceList};
use crate::error::Result;
use crate::query::{FilterValue, Filters, PageSizeOptions};
use crate::session::ListHandle;

use super::{ListOpening, spawn_list};

pub const CATEGORIES: ListResource = ListResource::new("categories", "categories");

/// Free-text search over category names
pub const QUERY_FILTER: &str = "query";

pub fn category_filters(query: Option<&str>) -> Filters {
    match query {
        Some(query) => Filters::new().with(QUERY_FILTER, FilterValue::text(query)),
        None => Filters::new(),
    }
}

/// Name of the category's theme, if it has one.
pub fn theme_name(category: &Record) -> Option<String> {
    category
        .text("theme.name")
        .filter(|name| !name.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct CategoryDesk {
    client: Arc<BackendClient>,
}

impl CategoryDesk {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    pub fn list_source(&self) -> ResourceList {
        ResourceList::new(Arc::clone(&self.client), CATEGORIES)
    }

    pub fn open(
        &self,
        options: PageSizeOptions,
        opening: &ListOpening,
    ) -> Result<(ListHandle<Record>, JoinHandle<()>)> {
        spawn_list(self.list_source(), options, opening)
    }

    /// `DELETE /categories/<id>`
    pub async fn remove(&self, id: &str) -> Result<()> {
        self.client.delete_record(CATEGORIES.path, id).await?;
        tracing::debug!(id, "category removed");
        Ok(())
    }

    /// Remove, then refresh `list` whatever the outcome; returns the removal's result.
    pub async fn remove_in(&self, list: &ListHandle<Record>, id: &str) -> Result<()> {
        let removed = self.remove(id).await;
        list.refresh().await?;
        removed
    }
}
