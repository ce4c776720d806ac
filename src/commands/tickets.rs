use jiff::civil::Date;
use owo_colors::OwoColorize;
use serde_json::json;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::{AppContext, paging_json, print_json, settled_view};
use crate::backend::Record;
use crate::display::{format_read_marker, format_timestamp, paging_footer};
use crate::error::Result;
use crate::fetch::Identified;
use crate::resources::tickets::{is_read, kind_label, response_count, ticket_field};
use crate::resources::{ListOpening, SortOrder, TicketDesk, TicketFilter, TicketKind};

/// A row in the ticket list table
#[derive(Tabled)]
struct TicketRow {
    #[tabled(rename = "")]
    marker: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Ticket")]
    tid: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Responses")]
    responses: usize,
}

impl TicketRow {
    fn from_record(ticket: &Record) -> Self {
        Self {
            marker: format_read_marker(is_read(ticket)),
            created: format_timestamp(ticket_field(ticket, "createdAt").as_deref()),
            kind: kind_label(ticket).to_string(),
            tid: ticket_field(ticket, "_id").unwrap_or_else(|| "-".to_string()),
            email: ticket_field(ticket, "email").unwrap_or_default(),
            responses: response_count(ticket),
        }
    }
}

pub struct TicketListOptions {
    pub page: u32,
    pub limit: Option<u32>,
    pub tid: Option<String>,
    pub kind: Option<String>,
    pub begin: Option<Date>,
    pub end: Option<Date>,
    pub order: Option<SortOrder>,
    pub json: bool,
}

impl TicketListOptions {
    fn filter(&self) -> Result<TicketFilter> {
        let kind = match &self.kind {
            Some(kind) => TicketKind::parse_filter(kind)?,
            None => None,
        };
        Ok(TicketFilter {
            tid: self.tid.clone(),
            kind,
            begin: self.begin,
            end: self.end,
            order: self.order,
        })
    }
}

/// List one page of tickets
pub async fn cmd_tickets_ls(options: TicketListOptions) -> Result<()> {
    let opening = ListOpening {
        filters: options.filter()?.to_filters()?,
        page: options.page,
        page_size: options.limit,
    };

    let ctx = AppContext::load()?;
    let desk = TicketDesk::new(ctx.client, ctx.config.session.admin);
    let (list, _session) = desk.open(ctx.config.pagination.clone(), &opening)?;
    let view = settled_view("tickets", &list).await?;

    if options.json {
        let mut output = paging_json(&view);
        output["tickets"] = json!(view.rows);
        return print_json(&output);
    }

    if !view.rows.is_empty() {
        let rows: Vec<TicketRow> = view.rows.iter().map(TicketRow::from_record).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
    println!("{}", paging_footer(&view).dimmed());

    Ok(())
}

/// Mark a ticket as read
pub async fn cmd_tickets_read(id: &str, json: bool) -> Result<()> {
    let ctx = AppContext::load()?;
    let desk = TicketDesk::new(ctx.client, ctx.config.session.admin);
    let updated = desk.mark_read(id).await?;

    if json {
        return print_json(&json!({
            "action": "ticket_read",
            "id": id,
            "ticket": updated,
        }));
    }

    let shown = updated.id().map_or_else(|| id.to_string(), |i| i.into_owned());
    println!("Marked ticket {} as read", shown.cyan());
    Ok(())
}
