use std::collections::HashSet;

use anyhow::Context;
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::warn;

use crate::db::KeyValueStore;
use crate::error::Result;
use crate::models::{ALL_CATEGORIES, Quote, QuoteDisplay};

/// Durable key holding the last selected category filter.
pub const SELECTED_CATEGORY_KEY: &str = "selectedCategory";

/// Session key mirroring the quote currently on screen.
pub const LAST_QUOTE_KEY: &str = "lastQuote";

/// Distinct categories in first-seen order.
pub fn categories(quotes: &[Quote]) -> impl Iterator<Item = &str> {
    let mut seen = HashSet::new();
    quotes
        .iter()
        .map(|q| q.category.as_str())
        .filter(move |category| seen.insert(*category))
}

/// Quotes visible under `selected`; `"all"` matches everything.
pub fn filter_by_category<'a>(
    quotes: &'a [Quote],
    selected: &'a str,
) -> impl Iterator<Item = &'a Quote> {
    quotes.iter().filter(move |q| in_category(q, selected))
}

fn in_category(quote: &Quote, selected: &str) -> bool {
    selected == ALL_CATEGORIES || quote.category == selected
}

/// Draw one quote uniformly from the filtered set.
pub fn pick_display<R: Rng + ?Sized>(
    quotes: &[Quote],
    selected: &str,
    rng: &mut R,
) -> QuoteDisplay {
    let candidates: Vec<&Quote> = filter_by_category(quotes, selected).collect();
    match candidates.choose(rng) {
        Some(quote) => QuoteDisplay::Quote {
            quote: (*quote).clone(),
        },
        None => QuoteDisplay::empty(),
    }
}

pub fn selected_category<S: KeyValueStore + ?Sized>(durable: &S) -> Result<String> {
    Ok(durable
        .get(SELECTED_CATEGORY_KEY)?
        .unwrap_or_else(|| ALL_CATEGORIES.to_string()))
}

pub fn save_selected_category<S: KeyValueStore + ?Sized>(
    durable: &S,
    category: &str,
) -> Result<()> {
    durable.set(SELECTED_CATEGORY_KEY, category)?;
    Ok(())
}

/// Quote display backed by session storage, so a reload can show the same
/// quote again without a fresh draw.
pub struct QuoteView<S: KeyValueStore> {
    session: S,
}

impl<S: KeyValueStore> QuoteView<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    /// Pick a random quote and remember it for the session. The empty state
    /// leaves the remembered quote alone.
    pub fn show<R: Rng + ?Sized>(
        &self,
        quotes: &[Quote],
        selected: &str,
        rng: &mut R,
    ) -> Result<QuoteDisplay> {
        let display = pick_display(quotes, selected, rng);
        if let Some(quote) = display.quote() {
            self.remember(quote)?;
        }
        Ok(display)
    }

    pub fn remember(&self, quote: &Quote) -> Result<()> {
        let json = serde_json::to_string(quote).context("Failed to serialize quote")?;
        self.session.set(LAST_QUOTE_KEY, &json)?;
        Ok(())
    }

    pub fn last_shown(&self) -> Result<Option<Quote>> {
        let Some(raw) = self.session.get(LAST_QUOTE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(quote) => Ok(Some(quote)),
            Err(e) => {
                warn!("ignoring unreadable session quote: {e}");
                Ok(None)
            }
        }
    }

    /// Show the remembered quote if it still fits `selected`, otherwise draw
    /// a new one.
    pub fn restore<R: Rng + ?Sized>(
        &self,
        quotes: &[Quote],
        selected: &str,
        rng: &mut R,
    ) -> Result<QuoteDisplay> {
        match self.last_shown()? {
            Some(quote) if in_category(&quote, selected) => Ok(QuoteDisplay::Quote { quote }),
            _ => self.show(quotes, selected, rng),
        }
    }
}
