//! Support tickets.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use jiff::civil::Date;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::backend::{BackendClient, ListResource, Record, ResourceList, UnreadTickets};
use crate::error::{BackofficeError, Result};
use crate::notifications::NotificationPoller;
use crate::query::{DateRange, FilterValue, Filters, PageSizeOptions};
use crate::session::ListHandle;

use super::{ListOpening, apply_update, spawn_list};

pub const TICKETS: ListResource = ListResource::new("tickets", "tickets");

/// Type filter placeholder meaning "any type"
pub const UNSPECIFIED_KIND: &str = "n/d";

pub const TID_FILTER: &str = "tid";
pub const KIND_FILTER: &str = "type";
pub const PERIOD_FILTER: &str = "period";
pub const ORDER_FILTER: &str = "order";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketKind {
    AccountChanged,
    SimpleAccountProblem,
    BugReport,
    ImprovementSuggestion,
}

impl TicketKind {
    pub const ALL: [TicketKind; 4] = [
        TicketKind::AccountChanged,
        TicketKind::SimpleAccountProblem,
        TicketKind::BugReport,
        TicketKind::ImprovementSuggestion,
    ];

    /// Wire value
    pub fn as_str(self) -> &'static str {
        match self {
            TicketKind::AccountChanged => "account-changed",
            TicketKind::SimpleAccountProblem => "simple-account-problem",
            TicketKind::BugReport => "bug-report",
            TicketKind::ImprovementSuggestion => "improvement-suggestion",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TicketKind::AccountChanged => "Account changed (profile 2)",
            TicketKind::SimpleAccountProblem => "Account changed (profile 1)",
            TicketKind::BugReport => "Bug report",
            TicketKind::ImprovementSuggestion => "Improvement suggestion",
        }
    }

    /// Parse a type filter; the placeholder and blanks mean no constraint.
    pub fn parse_filter(value: &str) -> Result<Option<TicketKind>> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(UNSPECIFIED_KIND) {
            return Ok(None);
        }
        value.parse().map(Some)
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketKind {
    type Err = BackofficeError;

    fn from_str(s: &str) -> Result<Self> {
        TicketKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let valid: Vec<_> = TicketKind::ALL.iter().map(|k| k.as_str()).collect();
                BackofficeError::ValidationFailure(format!(
                    "unknown ticket type '{s}', expected one of: {}, {UNSPECIFIED_KIND}",
                    valid.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = BackofficeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(BackofficeError::ValidationFailure(format!(
                "unknown order '{s}', expected 'asc' or 'desc'"
            ))),
        }
    }
}

/// The ticket list's filter form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub tid: Option<String>,
    pub kind: Option<TicketKind>,
    pub begin: Option<Date>,
    pub end: Option<Date>,
    pub order: Option<SortOrder>,
}

impl TicketFilter {
    /// Filter mapping for the query store. Rejects a period ending before it begins.
    pub fn to_filters(&self) -> Result<Filters> {
        if let (Some(begin), Some(end)) = (self.begin, self.end)
            && end < begin
        {
            return Err(BackofficeError::ValidationFailure(format!(
                "period ends ({end}) before it begins ({begin})"
            )));
        }

        let mut filters = Filters::new();
        if let Some(tid) = &self.tid {
            filters.insert(TID_FILTER, FilterValue::text(tid.as_str()));
        }
        if let Some(kind) = self.kind {
            filters.insert(KIND_FILTER, FilterValue::choice(kind.as_str()));
        }
        if self.begin.is_some() || self.end.is_some() {
            filters.insert(
                PERIOD_FILTER,
                FilterValue::Range(DateRange::new(self.begin, self.end)),
            );
        }
        if let Some(order) = self.order {
            filters.insert(ORDER_FILTER, FilterValue::choice(order.as_str()));
        }
        Ok(filters)
    }
}

/// A ticket's document: rows wrap it in `content`, notifications may not.
pub fn ticket_field(ticket: &Record, name: &str) -> Option<String> {
    ticket
        .text(&format!("content.{name}"))
        .or_else(|| ticket.text(name))
}

pub fn kind_label(ticket: &Record) -> &'static str {
    ticket_field(ticket, "type")
        .and_then(|t| t.parse::<TicketKind>().ok())
        .map_or("N/D", TicketKind::label)
}

pub fn is_read(ticket: &Record) -> bool {
    ticket.flag("content.readed") || ticket.flag("readed")
}

pub fn response_count(ticket: &Record) -> usize {
    ticket
        .len_of("content.responses")
        .max(ticket.len_of("responses"))
}

/// Ticket operations for one operator session.
#[derive(Debug, Clone)]
pub struct TicketDesk {
    client: Arc<BackendClient>,
    authorized: bool,
}

impl TicketDesk {
    /// `authorized` is the resolved admin flag of the session.
    pub fn new(client: Arc<BackendClient>, authorized: bool) -> Self {
        Self { client, authorized }
    }

    fn ensure_authorized(&self) -> Result<()> {
        if self.authorized {
            Ok(())
        } else {
            Err(BackofficeError::NotAuthorized("tickets".to_string()))
        }
    }

    pub fn list_source(&self) -> Result<ResourceList> {
        self.ensure_authorized()?;
        Ok(ResourceList::new(Arc::clone(&self.client), TICKETS))
    }

    /// Open the ticket list and issue its first fetch.
    pub fn open(
        &self,
        options: PageSizeOptions,
        opening: &ListOpening,
    ) -> Result<(ListHandle<Record>, JoinHandle<()>)> {
        spawn_list(self.list_source()?, options, opening)
    }

    /// `PUT /tickets/<id>` marking it read; returns the updated document.
    pub async fn mark_read(&self, id: &str) -> Result<Record> {
        self.ensure_authorized()?;
        let updated = self
            .client
            .update_record(TICKETS.path, id, &json!({ "readed": true }))
            .await?;
        tracing::debug!(id, "ticket marked read");
        Ok(updated)
    }

    /// Mark read, then patch the row in `list`. On failure the list is untouched.
    pub async fn mark_read_in(&self, list: &ListHandle<Record>, id: &str) -> Result<bool> {
        let updated = self.mark_read(id).await?;
        apply_update(list, id, updated).await
    }

    /// Poller for the unread badge; idle when the session is not authorized.
    pub fn unread_poller(
        &self,
        recent_limit: usize,
        interval: Duration,
    ) -> NotificationPoller<UnreadTickets> {
        NotificationPoller::new(Arc::new(UnreadTickets::new(Arc::clone(&self.client))), recent_limit)
            .with_interval(interval)
            .authorized(self.authorized)
    }
}
