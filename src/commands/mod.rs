//! Command implementations behind the `backoffice` binary.

mod categories;
mod config;
mod tickets;
mod unread;

use std::sync::Arc;

pub use categories::{cmd_categories_ls, cmd_categories_rm};
pub use config::{cmd_config_get, cmd_config_set, cmd_config_show};
pub use tickets::{TicketListOptions, cmd_tickets_ls, cmd_tickets_read};
pub use unread::cmd_unread;

use crate::backend::{BackendClient, Record};
use crate::config::Config;
use crate::error::{BackofficeError, Result};
use crate::fetch::Status;
use crate::projection::ListView;
use crate::session::ListHandle;

pub fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Configuration and client shared by the backend commands
pub(crate) struct AppContext {
    pub config: Config,
    pub client: Arc<BackendClient>,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        let client = Arc::new(BackendClient::from_config(&config)?);
        Ok(Self { config, client })
    }
}

/// Wait for the list's first settled view; a failed fetch becomes an error.
pub(crate) async fn settled_view(
    resource: &'static str,
    list: &ListHandle<Record>,
) -> Result<ListView<Record>> {
    let view = list.settled().await?.view;
    if view.status == Status::Error {
        return Err(BackofficeError::LoadFailed {
            resource,
            message: view
                .error_message
                .unwrap_or_else(|| "unknown error".to_string()),
        });
    }
    Ok(view)
}

/// Paging metadata included in JSON list output
pub(crate) fn paging_json(view: &ListView<Record>) -> serde_json::Value {
    serde_json::json!({
        "count": view.total_count,
        "page": view.page,
        "limit": view.page_size,
        "total_pages": view.total_pages,
    })
}
