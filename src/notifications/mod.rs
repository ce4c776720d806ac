//! Unread-ticket badge fed by polling.
//!
//! The badge is advisory: a failed poll is logged and otherwise ignored, so
//! the last good count and recent items stay on screen.

mod poller;

use async_trait::async_trait;
use jiff::Timestamp;

pub use poller::{BadgeTracker, NotificationPoller, PollerHandle, poll_once};

use crate::error::Result;

/// Number of recent unread items kept on the badge
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Seconds between polls when nothing else triggers one
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// What the backend reports about unread items
#[derive(Debug, Clone, PartialEq)]
pub struct UnreadSummary<T> {
    pub items: Vec<T>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnreadBadgeState<T> {
    pub count: u64,
    /// Newest first, never longer than the tracker's capacity
    pub recent_items: Vec<T>,
    /// `None` until a poll has succeeded
    pub last_fetched_at: Option<Timestamp>,
}

impl<T> Default for UnreadBadgeState<T> {
    fn default() -> Self {
        Self {
            count: 0,
            recent_items: Vec::new(),
            last_fetched_at: None,
        }
    }
}

/// Where unread summaries come from.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    type Item: Send;

    async fn fetch_unread(&self) -> Result<UnreadSummary<Self::Item>>;
}
