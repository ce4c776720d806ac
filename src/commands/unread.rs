use std::time::Duration;

use owo_colors::OwoColorize;
use serde_json::json;

use super::{AppContext, print_json};
use crate::backend::{Record, UnreadTickets};
use crate::display::{badge_label, format_timestamp};
use crate::error::{BackofficeError, Result};
use crate::notifications::{UnreadBadgeState, poll_once};
use crate::resources::TicketDesk;
use crate::resources::tickets::{kind_label, ticket_field};

fn badge_json(badge: &UnreadBadgeState<Record>) -> serde_json::Value {
    json!({
        "count": badge.count,
        "recent": badge.recent_items,
        "last_fetched_at": badge.last_fetched_at.map(|ts| ts.to_string()),
    })
}

fn print_badge(badge: &UnreadBadgeState<Record>) {
    let label = badge_label(badge.count);
    if badge.count == 0 {
        println!("{} unread tickets", label.dimmed());
    } else {
        println!("{} unread tickets", label.yellow().bold());
    }
    for ticket in &badge.recent_items {
        println!(
            "  {} {} {}",
            format_timestamp(ticket_field(ticket, "createdAt").as_deref()).dimmed(),
            kind_label(ticket),
            ticket_field(ticket, "email").unwrap_or_default().cyan()
        );
    }
    match badge.last_fetched_at {
        Some(at) => {
            let at = at.to_string();
            println!("{}", format!("updated {}", format_timestamp(Some(at.as_str()))).dimmed());
        }
        None => println!("{}", "not updated yet".dimmed()),
    }
}

/// Show the unread badge once, or keep it updated with `watch`
pub async fn cmd_unread(watch: bool, interval: Option<u64>, json: bool) -> Result<()> {
    let ctx = AppContext::load()?;
    if !ctx.config.session.admin {
        return Err(BackofficeError::NotAuthorized("unread tickets".to_string()));
    }
    let limit = ctx.config.notifications.recent_limit;

    if !watch {
        let source = UnreadTickets::new(ctx.client);
        let badge = poll_once(&source, limit).await;
        if json {
            return print_json(&badge_json(&badge));
        }
        print_badge(&badge);
        return Ok(());
    }

    let period = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| ctx.config.poll_interval());
    let desk = TicketDesk::new(ctx.client, ctx.config.session.admin);
    let (poller, _task) = desk.unread_poller(limit, period).spawn();
    let mut updates = poller.subscribe();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Err(BackofficeError::SessionClosed);
                }
                let badge = updates.borrow_and_update().clone();
                if json {
                    println!("{}", serde_json::to_string(&badge_json(&badge))?);
                } else {
                    print_badge(&badge);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("stopped watching unread tickets");
                return Ok(());
            }
        }
    }
}
