use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::error::{BackofficeError, Result};
use crate::fetch::{FetchRequest, Page};
use crate::notifications::UnreadSummary;

use super::record::{Record, json_kind};

/// Longest error body echoed back in a `ServerError`
const MAX_ERROR_BODY: usize = 200;

/// A paginated collection on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListResource {
    /// Path below the base URL, e.g. `tickets`
    pub path: &'static str,
    /// Response key holding the page's records; `items` is tried after it
    pub items_key: &'static str,
}

impl ListResource {
    pub const fn new(path: &'static str, items_key: &'static str) -> Self {
        Self { path, items_key }
    }
}

/// HTTP client for the backoffice REST backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl BackendClient {
    /// Build a client from configuration, honouring env overrides.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.backend_url()?,
            config.token(),
            config.http.timeout(),
            config.http.connect_timeout(),
        )
    }

    pub fn new(
        base_url: Url,
        token: Option<SecretString>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(BackofficeError::Config(format!(
                "backend URL '{base_url}' cannot be used as a base"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Base URL with `segments` appended as path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BackofficeError::Config(format!(
                    "backend URL '{}' cannot be used as a base",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET /<resource>?page=..&limit=..&<filters>` for `request`.
    pub fn list_url(&self, resource: &ListResource, request: &FetchRequest) -> Result<Url> {
        let mut url = self.endpoint(&[resource.path])?;
        url.query_pairs_mut().extend_pairs(request.query_pairs());
        Ok(url)
    }

    pub async fn fetch_list(
        &self,
        resource: &ListResource,
        request: &FetchRequest,
    ) -> Result<Page<Record>> {
        let url = self.list_url(resource, request)?;
        tracing::debug!(%url, epoch = request.epoch.value(), "fetching page");
        let body: Value = self.send(self.client.get(url)).await?.json().await?;
        parse_page(body, resource.items_key, request.page_size)
    }

    /// `PUT /<path>/<id>` with `body`; returns the updated record.
    pub async fn update_record(&self, path: &str, id: &str, body: &Value) -> Result<Record> {
        let url = self.endpoint(&[path, id])?;
        let response = self
            .send(self.client.put(url).json(body))
            .await
            .map_err(|e| not_found_as_record(e, id))?;
        let body: Value = response.json().await?;
        Record::try_from(body)
    }

    /// `DELETE /<path>/<id>`
    pub async fn delete_record(&self, path: &str, id: &str) -> Result<()> {
        let url = self.endpoint(&[path, id])?;
        self.send(self.client.delete(url))
            .await
            .map_err(|e| not_found_as_record(e, id))?;
        Ok(())
    }

    /// `GET /tickets/notifications`
    pub async fn fetch_notifications(&self) -> Result<UnreadSummary<Record>> {
        let url = self.endpoint(&["tickets", "notifications"])?;
        let body: Value = self.send(self.client.get(url)).await?.json().await?;
        parse_unread(body)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        };
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(BackofficeError::ServerError {
            status: Some(status.as_u16()),
            message: error_message(status, &body),
        })
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status.canonical_reason().unwrap_or("no reason given").to_string();
    }
    // Backends answer either `{"message": ..}` or plain text
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string());
    match message.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &message[..cut]),
        None => message,
    }
}

fn not_found_as_record(err: BackofficeError, id: &str) -> BackofficeError {
    match err {
        BackofficeError::ServerError {
            status: Some(404), ..
        } => BackofficeError::RecordNotFound(id.to_string()),
        other => other,
    }
}

/// Counts arrive as numbers or numeric strings.
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn malformed(message: String) -> BackofficeError {
    BackofficeError::ServerError {
        status: None,
        message,
    }
}

/// Read a list response body.
///
/// Records come from `items_key`, falling back to `items`. `count` is
/// required; a missing or zero `limit` means the requested size was used.
pub fn parse_page(body: Value, items_key: &str, requested_size: u32) -> Result<Page<Record>> {
    let mut fields = match body {
        Value::Object(fields) => fields,
        other => {
            return Err(malformed(format!(
                "expected a list response object, got {}",
                json_kind(&other)
            )));
        }
    };

    let items = fields
        .remove(items_key)
        .or_else(|| fields.remove("items"))
        .ok_or_else(|| malformed(format!("list response has no '{items_key}' array")))?;
    let items = match items {
        Value::Array(items) => items,
        other => {
            return Err(malformed(format!(
                "'{items_key}' should be an array, got {}",
                json_kind(&other)
            )));
        }
    };

    let total_count = fields
        .get("count")
        .and_then(as_count)
        .ok_or_else(|| malformed("list response has no numeric 'count'".to_string()))?;

    let effective_page_size = fields
        .get("limit")
        .and_then(as_count)
        .and_then(|limit| u32::try_from(limit).ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(requested_size);

    let items = items
        .into_iter()
        .map(Record::try_from)
        .collect::<Result<Vec<_>>>()?;

    Ok(Page {
        items,
        total_count,
        effective_page_size,
    })
}

/// Read a notifications body; missing fields mean nothing unread.
pub fn parse_unread(body: Value) -> Result<UnreadSummary<Record>> {
    let items = match body.get("tickets") {
        Some(Value::Array(items)) => items
            .iter()
            .cloned()
            .map(Record::try_from)
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };
    let count = body.get("count").and_then(as_count).unwrap_or(0);
    Ok(UnreadSummary { items, count })
}
