//! REST backend access.
//!
//! [`BackendClient`] speaks HTTP; [`ResourceList`] and [`UnreadTickets`]
//! adapt it to the list and notification sources the sessions consume.

mod client;
mod record;

use std::sync::Arc;

use async_trait::async_trait;

pub use client::{BackendClient, ListResource, parse_page, parse_unread};
pub use record::Record;

use crate::error::Result;
use crate::fetch::{FetchRequest, ListSource, Page};
use crate::notifications::{NotificationSource, UnreadSummary};

/// One paginated collection, fetched through a shared client.
#[derive(Debug, Clone)]
pub struct ResourceList {
    client: Arc<BackendClient>,
    resource: ListResource,
}

impl ResourceList {
    pub fn new(client: Arc<BackendClient>, resource: ListResource) -> Self {
        Self { client, resource }
    }
}

#[async_trait]
impl ListSource for ResourceList {
    type Item = Record;

    async fn fetch_page(&self, request: &FetchRequest) -> Result<Page<Record>> {
        self.client.fetch_list(&self.resource, request).await
    }
}

/// The unread ticket notifications endpoint.
#[derive(Debug, Clone)]
pub struct UnreadTickets {
    client: Arc<BackendClient>,
}

impl UnreadTickets {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationSource for UnreadTickets {
    type Item = Record;

    async fn fetch_unread(&self) -> Result<UnreadSummary<Record>> {
        self.client.fetch_notifications().await
    }
}
