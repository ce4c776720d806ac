use std::fmt;

use thiserror::Error;

/// Why a fetch did not produce a result.
///
/// Carried inside controller state, so it stays `Copy` and free of the
/// transport's error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Backend unreachable, connection reset or timed out
    NetworkFailure,
    /// Backend answered with a non-2xx status or an unreadable body
    ServerError,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::NetworkFailure => write!(f, "backend unreachable"),
            FetchErrorKind::ServerError => write!(f, "backend returned an error"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BackofficeError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("server error{}: {message}", status_suffix(.status))]
    ServerError {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid query: {0}")]
    ValidationFailure(String),

    #[error("not authorized to view {0}")]
    NotAuthorized(String),

    #[error("could not load {resource}: {message}")]
    LoadFailed {
        resource: &'static str,
        message: String,
    },

    #[error("record '{0}' not found")]
    RecordNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("session closed")]
    SessionClosed,
}

impl BackofficeError {
    /// Collapse a fetch error into the kind stored in controller state.
    ///
    /// Returns `None` for errors that are raised before any request is made.
    pub fn fetch_kind(&self) -> Option<FetchErrorKind> {
        match self {
            BackofficeError::NetworkFailure(_) => Some(FetchErrorKind::NetworkFailure),
            BackofficeError::ServerError { .. } | BackofficeError::Json(_) => {
                Some(FetchErrorKind::ServerError)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackofficeError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return BackofficeError::ServerError {
                status: Some(status.as_u16()),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return BackofficeError::ServerError {
                status: None,
                message: err.to_string(),
            };
        }
        BackofficeError::NetworkFailure(err.to_string())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, BackofficeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_kind_classification() {
        assert_eq!(
            BackofficeError::NetworkFailure("timed out".into()).fetch_kind(),
            Some(FetchErrorKind::NetworkFailure)
        );
        assert_eq!(
            BackofficeError::ServerError {
                status: Some(500),
                message: "boom".into()
            }
            .fetch_kind(),
            Some(FetchErrorKind::ServerError)
        );
        assert_eq!(
            BackofficeError::ValidationFailure("page 0".into()).fetch_kind(),
            None
        );
    }

    #[test]
    fn test_server_error_display_includes_status() {
        let err = BackofficeError::ServerError {
            status: Some(404),
            message: "missing".into(),
        };
        assert_eq!(err.to_string(), "server error (404): missing");

        let err = BackofficeError::ServerError {
            status: None,
            message: "bad body".into(),
        };
        assert_eq!(err.to_string(), "server error: bad body");
    }
}
