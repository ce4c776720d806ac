use owo_colors::OwoColorize;
use serde_json::json;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::{AppContext, paging_json, print_json, settled_view};
use crate::backend::Record;
use crate::display::paging_footer;
use crate::error::Result;
use crate::fetch::Identified;
use crate::resources::categories::{category_filters, theme_name};
use crate::resources::{CategoryDesk, ListOpening};

/// A row in the category list table
#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Theme")]
    theme: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl CategoryRow {
    fn from_record(category: &Record) -> Self {
        Self {
            name: category.text("name").unwrap_or_default(),
            theme: theme_name(category).unwrap_or_else(|| "No category".to_string()),
            id: category.id().map(|id| id.into_owned()).unwrap_or_default(),
        }
    }
}

/// List one page of categories
pub async fn cmd_categories_ls(
    query: Option<&str>,
    page: u32,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let opening = ListOpening {
        filters: category_filters(query),
        page,
        page_size: limit,
    };

    let ctx = AppContext::load()?;
    let desk = CategoryDesk::new(ctx.client);
    let (list, _session) = desk.open(ctx.config.pagination.clone(), &opening)?;
    let view = settled_view("categories", &list).await?;

    if json {
        let mut output = paging_json(&view);
        output["categories"] = json!(view.rows);
        return print_json(&output);
    }

    if !view.rows.is_empty() {
        let rows: Vec<CategoryRow> = view.rows.iter().map(CategoryRow::from_record).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
    println!("{}", paging_footer(&view).dimmed());

    Ok(())
}

/// Delete a category
pub async fn cmd_categories_rm(id: &str, json: bool) -> Result<()> {
    let ctx = AppContext::load()?;
    CategoryDesk::new(ctx.client).remove(id).await?;

    if json {
        return print_json(&json!({
            "action": "category_removed",
            "id": id,
            "success": true,
        }));
    }

    println!("Removed category {}", id.cyan());
    Ok(())
}
