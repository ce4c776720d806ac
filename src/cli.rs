use clap::{Parser, Subcommand};
use jiff::civil::Date;

use crate::resources::SortOrder;

#[derive(Parser)]
#[command(name = "backoffice")]
#[command(about = "Browse and manage backoffice tickets and categories")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Support tickets
    #[command(visible_alias = "t")]
    Tickets {
        #[command(subcommand)]
        action: TicketAction,
    },

    /// Article categories
    #[command(visible_alias = "c")]
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Show the unread ticket badge
    Unread {
        /// Keep polling and print the badge whenever it changes
        #[arg(short, long)]
        watch: bool,

        /// Seconds between polls while watching (default: from config)
        #[arg(long)]
        interval: Option<u64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum TicketAction {
    /// List tickets one page at a time
    #[command(visible_alias = "list")]
    Ls {
        /// Page to show, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Page size; must be one of the configured sizes
        #[arg(short, long)]
        limit: Option<u32>,

        /// Ticket id to look for
        #[arg(long)]
        tid: Option<String>,

        /// Ticket type: account-changed, simple-account-problem, bug-report,
        /// improvement-suggestion, or n/d for any
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        /// Created on or after (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        begin: Option<Date>,

        /// Created on or before (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        end: Option<Date>,

        /// Sort order by creation date: asc or desc
        #[arg(long, value_parser = parse_order)]
        order: Option<SortOrder>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark a ticket as read
    Read {
        /// Ticket id
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// List categories one page at a time
    #[command(visible_alias = "list")]
    Ls {
        /// Search category names
        #[arg(short, long)]
        query: Option<String>,

        /// Page to show, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Page size; must be one of the configured sizes
        #[arg(short, long)]
        limit: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a category
    #[command(visible_alias = "remove")]
    Rm {
        /// Category id
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Display current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one configuration value
    Get {
        /// Key, e.g. backend_url or pagination.default_page_size
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Key, e.g. backend_url or pagination.default_page_size
        key: String,

        /// New value; page sizes are comma separated
        value: String,
    },
}

fn parse_date(s: &str) -> Result<Date, String> {
    s.parse()
        .map_err(|_| format!("Invalid date '{s}'. Expected YYYY-MM-DD"))
}

fn parse_order(s: &str) -> Result<SortOrder, String> {
    s.parse().map_err(|_| "Invalid order. Must be one of: asc, desc".to_string())
}
