use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BackofficeError, Result};
use crate::fetch::Identified;

/// A backend document, kept as loosely typed JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Look up a dotted path such as `content.type`.
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Field rendered as text; strings unquoted, null and missing as `None`.
    pub fn text(&self, path: &str) -> Option<String> {
        match self.field(path)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn flag(&self, path: &str) -> bool {
        self.field(path).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Length of an array field, 0 when missing.
    pub fn len_of(&self, path: &str) -> usize {
        self.field(path)
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Apply a record returned by an update.
    ///
    /// Ticket rows wrap the document in `content`; the update returns that
    /// document, so it replaces `content`. Other rows take the returned
    /// fields directly.
    pub fn apply_update(&mut self, updated: Record) {
        if self.0.get("content").is_some_and(Value::is_object) {
            self.0.insert("content".to_string(), updated.into_value());
        } else {
            self.0.extend(updated.0);
        }
    }
}

impl TryFrom<Value> for Record {
    type Error = BackofficeError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Record(fields)),
            other => Err(BackofficeError::ServerError {
                status: None,
                message: format!("expected a record object, got {}", json_kind(&other)),
            }),
        }
    }
}

impl Identified for Record {
    fn id(&self) -> Option<Cow<'_, str>> {
        ["_id", "id"]
            .into_iter()
            .find_map(|key| match self.0.get(key)? {
                Value::String(s) => Some(Cow::Borrowed(s.as_str())),
                Value::Number(n) => Some(Cow::Owned(n.to_string())),
                _ => None,
            })
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
