use jiff::Timestamp;
use owo_colors::OwoColorize;

use crate::projection::ListView;

/// Counts above this show as `99+`
pub const BADGE_MAX: u64 = 99;

pub fn format_read_marker(read: bool) -> String {
    if read {
        "read".dimmed().to_string()
    } else {
        "new".yellow().bold().to_string()
    }
}

pub fn badge_label(count: u64) -> String {
    if count > BADGE_MAX {
        format!("{BADGE_MAX}+")
    } else {
        count.to_string()
    }
}

/// Render an ISO timestamp as `YYYY-MM-DD HH:MM` UTC; anything else is shown as is.
pub fn format_timestamp(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => match raw.parse::<Timestamp>() {
            Ok(ts) => ts.strftime("%Y-%m-%d %H:%M").to_string(),
            Err(_) => raw.to_string(),
        },
        None => "-".to_string(),
    }
}

/// Line under a table describing which rows are shown.
pub fn paging_footer<T>(view: &ListView<T>) -> String {
    if view.is_past_end() {
        return format!(
            "Page {} is past the last page ({}) of {} result(s)",
            view.page.unwrap_or_default(),
            view.total_pages,
            view.total_count
        );
    }
    if view.is_empty {
        return "No results".to_string();
    }
    match (view.displayed_range, view.page) {
        (Some(range), Some(page)) => format!(
            "Showing {}-{} of {} (page {} of {})",
            range.from, range.to, range.total, page, view.total_pages
        ),
        _ => String::new(),
    }
}
