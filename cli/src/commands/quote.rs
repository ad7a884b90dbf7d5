use anyhow::Result;

use crate::remote::HttpRemote;
use quotebook_core::models::{ALL_CATEGORIES, Quote};
use quotebook_core::service::Action;
use quotebook_core::view::filter_by_category;

use super::helpers::{json_error, print_quote_table, render_outcome};
use super::{Service, run_effects};

pub(crate) fn cmd_show(service: &mut Service, last: bool, json: bool) -> Result<()> {
    let action = if last {
        Action::Restore
    } else {
        Action::ShowRandom
    };
    let outcome = service.dispatch(action, &mut rand::rng())?;
    render_outcome(&outcome, json)
}

pub(crate) async fn cmd_add(
    service: &mut Service,
    remote: Option<&HttpRemote>,
    text: &str,
    category: &str,
    json: bool,
) -> Result<()> {
    let outcome = service.dispatch(
        Action::Add {
            text: text.to_string(),
            category: category.to_string(),
        },
        &mut rand::rng(),
    )?;
    render_outcome(&outcome, json)?;
    run_effects(service, remote, outcome.effects, None, json).await
}

pub(crate) fn cmd_list(service: &Service, category: Option<&str>, json: bool) -> Result<()> {
    let category = category.unwrap_or(ALL_CATEGORIES);
    let quotes: Vec<&Quote> = filter_by_category(service.store().quotes(), category).collect();

    if quotes.is_empty() && category != ALL_CATEGORIES {
        if json {
            println!(
                "{}",
                json_error(&format!("No quotes in category '{category}'"))
            );
        } else {
            eprintln!("No quotes in category '{category}'.");
        }
    } else if json {
        println!("{}", serde_json::to_string_pretty(&quotes)?);
    } else if quotes.is_empty() {
        eprintln!("No quotes found. Use `quotebook add` to add one.");
    } else {
        print_quote_table(&quotes);
    }

    Ok(())
}

pub(crate) fn cmd_categories(service: &Service, json: bool) -> Result<()> {
    let categories = service.categories();
    let selected = service.selected_category()?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "selected": selected, "categories": categories })
        );
        return Ok(());
    }

    let marker = |name: &str| if name == selected { "*" } else { " " };
    println!("{} {ALL_CATEGORIES}", marker(ALL_CATEGORIES));
    for category in &categories {
        println!("{} {category}", marker(category));
    }
    Ok(())
}

pub(crate) fn cmd_filter(service: &mut Service, category: &str, json: bool) -> Result<()> {
    let outcome = service.dispatch(
        Action::SelectCategory(category.to_string()),
        &mut rand::rng(),
    )?;
    render_outcome(&outcome, json)
}
