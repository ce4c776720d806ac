//! Configuration commands.
//!
//! - `config show`: Display current configuration
//! - `config get`: Print one value
//! - `config set`: Set a value

use owo_colors::OwoColorize;
use serde_json::json;

use super::print_json;
use crate::config::Config;
use crate::error::{BackofficeError, Result};

const TOKEN_KEY: &str = "auth.token";

/// Mask a sensitive value by showing only the first 2 and last 2 characters
fn mask_sensitive_value(value: &str) -> String {
    let char_count = value.chars().count();
    if char_count > 4 {
        let first: String = value.chars().take(2).collect();
        let last: String = value.chars().skip(char_count - 2).collect();
        format!("{first}...{last}")
    } else {
        "****".to_string()
    }
}

/// Show current configuration
pub fn cmd_config_show(json: bool) -> Result<()> {
    let config = Config::load()?;
    let backend_url = config.backend_url()?;

    if json {
        return print_json(&json!({
            "backend_url": backend_url.as_str(),
            "auth": {
                "token_configured": config.token_configured(),
            },
            "session": {
                "admin": config.session.admin,
            },
            "pagination": {
                "page_sizes": config.pagination.page_sizes,
                "default_page_size": config.pagination.default_page_size,
            },
            "notifications": {
                "interval_secs": config.notifications.interval_secs,
                "recent_limit": config.notifications.recent_limit,
            },
            "http": {
                "timeout_secs": config.http.timeout_secs,
                "connect_timeout_secs": config.http.connect_timeout_secs,
            },
            "config_file": Config::config_path().to_string_lossy(),
        }));
    }

    let token_status = if config.token_configured() {
        "configured".green().to_string()
    } else {
        "not configured".dimmed().to_string()
    };

    println!("{}\n", "Configuration:".cyan().bold());
    println!("{}: {}", "backend_url".cyan(), backend_url);
    println!("{}:\n  token: {}", "auth".cyan(), token_status);
    println!("{}:\n  admin: {}", "session".cyan(), config.session.admin);
    println!(
        "{}:\n  page_sizes: {}\n  default_page_size: {}",
        "pagination".cyan(),
        config.get("pagination.page_sizes")?,
        config.pagination.default_page_size
    );
    println!(
        "{}:\n  interval_secs: {}\n  recent_limit: {}",
        "notifications".cyan(),
        config.notifications.interval_secs,
        config.notifications.recent_limit
    );
    println!(
        "{}:\n  timeout_secs: {}\n  connect_timeout_secs: {}",
        "http".cyan(),
        config.http.timeout_secs,
        config.http.connect_timeout_secs
    );
    println!(
        "\n{}",
        format!("Config file: {}", Config::config_path().display()).dimmed()
    );
    Ok(())
}

/// Print a single configuration value; the token is masked
pub fn cmd_config_get(key: &str) -> Result<()> {
    let config = Config::load()?;
    let value = config.get(key)?;

    if key == TOKEN_KEY {
        if value.is_empty() {
            return Err(BackofficeError::Config(format!("{TOKEN_KEY} not set")));
        }
        println!(
            "{} (masked - showing first 2 and last 2 characters)",
            mask_sensitive_value(&value)
        );
    } else {
        println!("{value}");
    }
    Ok(())
}

/// Set a configuration value and save the file
pub fn cmd_config_set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    if key == TOKEN_KEY {
        println!("Set {}", key.cyan());
    } else {
        println!("Set {} to {}", key.cyan(), config.get(key)?);
    }
    Ok(())
}
