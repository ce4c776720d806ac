//! Fetch coordination for paginated lists.
//!
//! A [`FetchCoordinator`] turns query states into epoch-tagged requests and
//! only lets the response for the latest epoch mutate [`ControllerState`].
//! [`ListController`] pairs it with a [`QueryStore`](crate::query::QueryStore).

mod controller;
mod coordinator;

use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;

pub use controller::ListController;
pub use coordinator::{FetchCoordinator, Settlement};

use crate::error::{BackofficeError, FetchErrorKind, Result};
use crate::query::{Epoch, Filters, QueryState};

/// Records the controller can address individually.
pub trait Identified {
    /// Stable identifier, if the record carries one
    fn id(&self) -> Option<Cow<'_, str>>;
}

/// Everything needed to ask the backend for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub epoch: Epoch,
    pub page: u32,
    pub page_size: u32,
    pub filters: Filters,
}

impl FetchRequest {
    pub fn from_state(state: &QueryState) -> Self {
        Self {
            epoch: state.epoch,
            page: state.page,
            page_size: state.page_size,
            filters: state.filters.clone(),
        }
    }

    /// `page`, `limit`, then the constraining filters.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.page_size.to_string()),
        ];
        pairs.extend(self.filters.to_query_pairs());
        pairs
    }
}

/// One page as the backend returned it
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matching records for the filters, across all pages
    pub total_count: u64,
    /// Page size the backend actually applied
    pub effective_page_size: u32,
}

/// A page accepted into controller state, tagged with its request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub effective_page_size: u32,
    /// Page number the result was requested for
    pub page: u32,
    pub responded_epoch: Epoch,
}

/// Failure recorded in controller state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub detail: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl From<&BackofficeError> for FetchError {
    fn from(err: &BackofficeError) -> Self {
        let kind = err.fetch_kind().unwrap_or(FetchErrorKind::ServerError);
        FetchError::new(kind, err.to_string())
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.detail)
        }
    }
}

/// A response on its way back to the coordinator
#[derive(Debug, Clone)]
pub struct FetchResponse<T> {
    /// Epoch the request was issued under
    pub epoch: Epoch,
    pub page: u32,
    pub outcome: std::result::Result<Page<T>, FetchError>,
}

impl<T> FetchResponse<T> {
    pub fn success(request: &FetchRequest, page: Page<T>) -> Self {
        Self {
            epoch: request.epoch,
            page: request.page,
            outcome: Ok(page),
        }
    }

    pub fn failure(request: &FetchRequest, error: FetchError) -> Self {
        Self {
            epoch: request.epoch,
            page: request.page,
            outcome: Err(error),
        }
    }

    pub fn from_result(request: &FetchRequest, result: Result<Page<T>>) -> Self {
        match result {
            Ok(page) => Self::success(request, page),
            Err(err) => Self::failure(request, FetchError::from(&err)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Idle => write!(f, "idle"),
            Status::Loading => write!(f, "loading"),
            Status::Success => write!(f, "success"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// State owned by the coordinator; only ever read by projections.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState<T> {
    pub status: Status,
    pub last_accepted: Option<FetchResult<T>>,
    pub last_error: Option<FetchError>,
    /// Epoch of the most recently issued request
    pub epoch_issued: Option<Epoch>,
    /// Responses dropped because a newer request superseded them
    pub discarded_responses: u64,
}

impl<T> Default for ControllerState<T> {
    fn default() -> Self {
        Self {
            status: Status::Idle,
            last_accepted: None,
            last_error: None,
            epoch_issued: None,
            discarded_responses: 0,
        }
    }
}

/// Where list pages come from.
#[async_trait]
pub trait ListSource: Send + Sync {
    type Item: Send;

    async fn fetch_page(&self, request: &FetchRequest) -> Result<Page<Self::Item>>;
}
