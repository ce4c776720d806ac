pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod fetch;
pub mod notifications;
pub mod projection;
pub mod query;
pub mod resources;
pub mod session;

pub use backend::{BackendClient, Record};
pub use config::Config;
pub use error::{BackofficeError, FetchErrorKind, Result};
pub use fetch::{ControllerState, FetchCoordinator, ListController, ListSource, Settlement, Status};
pub use notifications::{NotificationPoller, NotificationSource, UnreadBadgeState};
pub use projection::{ListView, project};
pub use query::{Epoch, FilterValue, Filters, PageSizeOptions, QueryState, QueryStore};
pub use session::{ListHandle, ListSession, ListSnapshot};
