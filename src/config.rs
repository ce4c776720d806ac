//! Application configuration.
//!
//! Configuration is stored in `.backoffice/config.yaml` and includes:
//! - Backend base URL and bearer token
//! - Whether the session is an administrator
//! - Allowed page sizes
//! - Unread poll interval and badge size
//! - HTTP timeouts

use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BackofficeError, Result};
use crate::notifications::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RECENT_LIMIT};
use crate::query::PageSizeOptions;

/// Directory holding the configuration file, relative to the working directory
pub const CONFIG_DIR: &str = ".backoffice";

pub const CONFIG_FILE: &str = "config.yaml";

/// Overrides `backend_url`
pub const URL_ENV: &str = "BACKOFFICE_URL";

/// Overrides `auth.token`
pub const TOKEN_ENV: &str = "BACKOFFICE_TOKEN";

const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

/// Keys accepted by `config get` and `config set`
pub const CONFIG_KEYS: &[&str] = &[
    "backend_url",
    "auth.token",
    "session.admin",
    "pagination.page_sizes",
    "pagination.default_page_size",
    "notifications.interval_secs",
    "notifications.recent_limit",
    "http.timeout_secs",
    "http.connect_timeout_secs",
];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    #[serde(default, skip_serializing_if = "AuthConfig::is_empty")]
    pub auth: AuthConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub pagination: PageSizeOptions,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            auth: AuthConfig::default(),
            session: SessionConfig::default(),
            pagination: PageSizeOptions::default(),
            notifications: NotificationConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AuthConfig {
    fn is_empty(&self) -> bool {
        self.token.is_none()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Resolved authorization of the operator (default: true)
    #[serde(default = "default_admin")]
    pub admin: bool,
}

fn default_admin() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            admin: default_admin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Seconds between unread polls (default: 60, 0 = only on demand)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Recent unread tickets kept on the badge (default: 5)
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_recent_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            recent_limit: default_recent_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Total request timeout in seconds (default: 60)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds (default: 30)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Config {
    /// Path `save` writes to
    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Config file in the platform configuration directory
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "backoffice")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load the working directory's config, else the user's, else defaults.
    pub fn load() -> Result<Self> {
        let candidates = std::iter::once(Self::config_path()).chain(Self::user_config_path());
        for path in candidates {
            if !path.exists() {
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|e| {
                BackofficeError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to read config at {}: {}", path.display(), e),
                ))
            })?;
            tracing::debug!(path = %path.display(), "loaded configuration");
            return Self::from_yaml(&content);
        }
        Ok(Config::default())
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.pagination.validate()?;
        Url::parse(&self.backend_url)?;
        Ok(())
    }

    /// Save configuration to the working directory's config file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(&path, content)?;

        // The file may hold a token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Backend base URL from `BACKOFFICE_URL` or the config file
    pub fn backend_url(&self) -> Result<Url> {
        let raw = non_empty_env(URL_ENV).unwrap_or_else(|| self.backend_url.clone());
        Ok(Url::parse(&raw)?)
    }

    /// Bearer token from `BACKOFFICE_TOKEN` or the config file
    pub fn token(&self) -> Option<SecretString> {
        self.token_over(non_empty_env(TOKEN_ENV))
    }

    /// `env_token` wins over the file's token.
    fn token_over(&self, env_token: Option<String>) -> Option<SecretString> {
        env_token
            .or_else(|| self.auth.token.clone())
            .map(SecretString::from)
    }

    pub fn token_configured(&self) -> bool {
        non_empty_env(TOKEN_ENV).is_some() || self.auth.token.is_some()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.notifications.interval_secs)
    }

    /// Current value of `key` as it would be written on the command line
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "backend_url" => self.backend_url.clone(),
            "auth.token" => self.auth.token.clone().unwrap_or_default(),
            "session.admin" => self.session.admin.to_string(),
            "pagination.page_sizes" => self
                .pagination
                .page_sizes
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(","),
            "pagination.default_page_size" => self.pagination.default_page_size.to_string(),
            "notifications.interval_secs" => self.notifications.interval_secs.to_string(),
            "notifications.recent_limit" => self.notifications.recent_limit.to_string(),
            "http.timeout_secs" => self.http.timeout_secs.to_string(),
            "http.connect_timeout_secs" => self.http.connect_timeout_secs.to_string(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set `key` from its command line form, validating the result.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        match key {
            "backend_url" => {
                Url::parse(value)?;
                updated.backend_url = value.to_string();
            }
            "auth.token" => {
                updated.auth.token = (!value.is_empty()).then(|| value.to_string());
            }
            "session.admin" => updated.session.admin = parse_value(key, value)?,
            "pagination.page_sizes" => {
                let sizes = value
                    .split(',')
                    .map(|s| parse_value::<u32>(key, s.trim()))
                    .collect::<Result<Vec<_>>>()?;
                updated.pagination =
                    PageSizeOptions::new(sizes, updated.pagination.default_page_size)?;
            }
            "pagination.default_page_size" => {
                updated.pagination.default_page_size = parse_value(key, value)?;
            }
            "notifications.interval_secs" => {
                updated.notifications.interval_secs = parse_value(key, value)?;
            }
            "notifications.recent_limit" => {
                updated.notifications.recent_limit = parse_value(key, value)?;
            }
            "http.timeout_secs" => updated.http.timeout_secs = parse_value(key, value)?,
            "http.connect_timeout_secs" => {
                updated.http.connect_timeout_secs = parse_value(key, value)?;
            }
            _ => return Err(unknown_key(key)),
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| BackofficeError::Config(format!("invalid value '{value}' for {key}")))
}

fn unknown_key(key: &str) -> BackofficeError {
    BackofficeError::Config(format!(
        "unknown config key '{key}'. Valid keys: {}",
        CONFIG_KEYS.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.backend_url, "http://localhost:3000");
        assert!(config.auth.token.is_none());
        assert!(config.session.admin);
        assert_eq!(config.pagination.default_page_size, 10);
        assert_eq!(config.notifications.interval_secs, 60);
        assert_eq!(config.notifications.recent_limit, 5);
        assert_eq!(config.http.timeout(), Duration::from_secs(60));
        assert_eq!(config.http.connect_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config = Config::from_yaml("pagination:\n  page_sizes: [5, 20]\n  default_page_size: 5\n")
            .unwrap();
        assert_eq!(config.pagination.page_sizes, vec![5, 20]);
        assert_eq!(config.backend_url, "http://localhost:3000");
        assert!(config.session.admin);
    }

    #[test]
    fn test_yaml_with_default_outside_sizes_rejected() {
        let err = Config::from_yaml("pagination:\n  page_sizes: [5, 20]\n  default_page_size: 10\n")
            .unwrap_err();
        assert!(matches!(err, BackofficeError::ValidationFailure(_)));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = Config::default();
        config.set("auth.token", "secret-token").unwrap();
        config.set("session.admin", "false").unwrap();

        let yaml = serde_yaml_ng::to_string(&config).unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.auth.token.as_deref(), Some("secret-token"));
        assert!(!parsed.session.admin);
    }

    #[test]
    fn test_auth_debug_redacts_token() {
        let auth = AuthConfig {
            token: Some("secret-token".to_string()),
        };
        let debug = format!("{auth:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_set_and_get_every_key() {
        let mut config = Config::default();
        config.set("backend_url", "https://api.example.com/v1").unwrap();
        config.set("pagination.page_sizes", "10, 20, 40").unwrap();
        config.set("pagination.default_page_size", "20").unwrap();
        config.set("notifications.interval_secs", "15").unwrap();
        config.set("notifications.recent_limit", "3").unwrap();
        config.set("http.timeout_secs", "5").unwrap();
        config.set("http.connect_timeout_secs", "2").unwrap();

        assert_eq!(config.get("backend_url").unwrap(), "https://api.example.com/v1");
        assert_eq!(config.get("pagination.page_sizes").unwrap(), "10,20,40");
        assert_eq!(config.get("pagination.default_page_size").unwrap(), "20");
        assert_eq!(config.get("notifications.interval_secs").unwrap(), "15");
        assert_eq!(config.get("notifications.recent_limit").unwrap(), "3");
        assert_eq!(config.get("http.timeout_secs").unwrap(), "5");
        assert_eq!(config.get("http.connect_timeout_secs").unwrap(), "2");
    }

    #[test]
    fn test_set_rejects_invalid_values_without_changing_config() {
        let mut config = Config::default();
        assert!(config.set("session.admin", "maybe").is_err());
        assert!(config.set("backend_url", "not a url").is_err());
        assert!(config.set("pagination.default_page_size", "7").is_err());
        assert!(config.set("pagination.page_sizes", "25,50").is_err());
        assert!(config.set("no.such.key", "1").is_err());

        assert_eq!(config.pagination, PageSizeOptions::default());
        assert_eq!(config.backend_url, "http://localhost:3000");
    }

    #[test]
    fn test_token_resolution() {
        let mut config = Config::default();
        assert!(config.token_over(None).is_none());

        config.auth.token = Some("file-token".to_string());
        assert_eq!(config.token_over(None).unwrap().expose_secret(), "file-token");
        assert_eq!(
            config
                .token_over(Some("env-token".to_string()))
                .unwrap()
                .expose_secret(),
            "env-token"
        );
    }
}
