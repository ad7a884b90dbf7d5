use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use quotebook_core::models::{Notification, NotificationLevel, Quote, QuoteDisplay};
use quotebook_core::service::Outcome;

pub(crate) fn render_outcome(outcome: &Outcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    if let Some(display) = &outcome.display {
        print_display(display);
    }
    for notification in &outcome.notifications {
        print_notification(notification);
    }
    Ok(())
}

pub(crate) fn print_display(display: &QuoteDisplay) {
    match display {
        QuoteDisplay::Quote { quote } => {
            println!("\"{}\"", quote.text);
            println!("  -- {}", quote.category);
        }
        QuoteDisplay::Empty { message } => println!("{message}"),
    }
}

/// Notifications go to stderr so stdout stays clean for quotes and JSON.
pub(crate) fn print_notification(notification: &Notification) {
    match notification.level {
        NotificationLevel::Error => eprintln!("Error: {}", notification.message),
        NotificationLevel::Info | NotificationLevel::Success => {
            eprintln!("{}", notification.message);
        }
    }
}

pub(crate) fn print_quote_table(quotes: &[&Quote]) {
    #[derive(Tabled)]
    struct QuoteRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Quote")]
        text: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Updated")]
        updated: String,
    }

    let rows: Vec<QuoteRow> = quotes
        .iter()
        .enumerate()
        .map(|(i, q)| QuoteRow {
            idx: i + 1,
            id: q.id.map_or("-".into(), |id| id.to_string()),
            text: truncate(&q.text, 60),
            category: truncate(&q.category, 20),
            updated: q.updated_at.map_or("-".into(), format_millis),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
