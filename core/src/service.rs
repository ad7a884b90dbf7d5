use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::db::KeyValueStore;
use crate::error::{QuoteError, Result};
use crate::models::{ALL_CATEGORIES, EXPORT_FILE_NAME, Notification, Quote, QuoteDisplay};
use crate::remote::RemoteQuotes;
use crate::store::{QuoteStore, parse_import};
use crate::sync::{SyncAgent, SyncReport, apply_fetch};
use crate::view::{self, QuoteView};

pub const ADD_SUCCESS_MESSAGE: &str = "New quote added successfully!";
pub const IMPORT_SUCCESS_MESSAGE: &str = "Quotes imported successfully!";

/// A user-facing action. Each one maps to a store operation plus a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ShowRandom,
    Restore,
    Add { text: String, category: String },
    SelectCategory(String),
    Import(String),
    Export,
    Sync,
}

/// Side effect the driver must carry out after a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fire-and-forget push of a freshly added quote.
    Push(Quote),
    Sync,
    WriteExport {
        file_name: &'static str,
        contents: String,
    },
}

/// Everything the rendering layer needs after an action.
#[derive(Debug, Default, Serialize)]
pub struct Outcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<QuoteDisplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    pub notifications: Vec<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncReport>,
    #[serde(skip)]
    pub effects: Vec<Effect>,
}

pub struct QuoteService<D: KeyValueStore, E: KeyValueStore> {
    store: QuoteStore<D>,
    view: QuoteView<E>,
    agent: SyncAgent,
    hide_after_ms: u64,
}

impl<D: KeyValueStore, E: KeyValueStore> QuoteService<D, E> {
    pub fn open(durable: D, session: E, hide_after_ms: u64) -> Result<Self> {
        Ok(Self {
            store: QuoteStore::load(durable)?,
            view: QuoteView::new(session),
            agent: SyncAgent::new(),
            hide_after_ms,
        })
    }

    #[must_use]
    pub fn store(&self) -> &QuoteStore<D> {
        &self.store
    }

    #[must_use]
    pub fn agent(&self) -> &SyncAgent {
        &self.agent
    }

    #[must_use]
    pub fn hide_after_ms(&self) -> u64 {
        self.hide_after_ms
    }

    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        view::categories(self.store.quotes())
            .map(str::to_string)
            .collect()
    }

    pub fn selected_category(&self) -> Result<String> {
        view::selected_category(self.store.storage())
    }

    pub fn dispatch<R: Rng + ?Sized>(&mut self, action: Action, rng: &mut R) -> Result<Outcome> {
        debug!(?action, "dispatch");
        match action {
            Action::ShowRandom => Ok(Outcome {
                display: Some(self.show(rng)?),
                ..Outcome::default()
            }),
            Action::Restore => {
                let selected = self.selected_category()?;
                Ok(Outcome {
                    display: Some(self.view.restore(self.store.quotes(), &selected, rng)?),
                    ..Outcome::default()
                })
            }
            Action::Add { text, category } => match self.store.add(&text, &category) {
                Ok(quote) => {
                    let mut outcome = self.refreshed(rng)?;
                    outcome
                        .notifications
                        .push(Notification::success(ADD_SUCCESS_MESSAGE, self.hide_after_ms));
                    outcome.effects.push(Effect::Push(quote));
                    Ok(outcome)
                }
                Err(e) => self.rejected(e),
            },
            Action::SelectCategory(category) => {
                let category = match category.trim() {
                    "" => ALL_CATEGORIES.to_string(),
                    trimmed => trimmed.to_string(),
                };
                view::save_selected_category(self.store.storage(), &category)?;
                Ok(Outcome {
                    display: Some(self.show(rng)?),
                    ..Outcome::default()
                })
            }
            Action::Import(contents) => {
                let records = match parse_import(&contents) {
                    Ok(records) => records,
                    Err(e) => return self.rejected(e),
                };
                self.store.import_many(records)?;
                let mut outcome = self.refreshed(rng)?;
                outcome
                    .notifications
                    .push(Notification::success(IMPORT_SUCCESS_MESSAGE, self.hide_after_ms));
                Ok(outcome)
            }
            Action::Export => Ok(Outcome {
                effects: vec![Effect::WriteExport {
                    file_name: EXPORT_FILE_NAME,
                    contents: self.store.export_all()?,
                }],
                ..Outcome::default()
            }),
            Action::Sync => Ok(Outcome {
                effects: vec![Effect::Sync],
                ..Outcome::default()
            }),
        }
    }

    /// Run one sync round inline and refresh the view when the store changed.
    pub async fn sync<R, G>(&mut self, remote: &R, rng: &mut G) -> Result<Outcome>
    where
        R: RemoteQuotes,
        G: Rng + ?Sized,
    {
        let report = self.agent.run_round(&mut self.store, remote).await;
        self.after_sync(report, rng)
    }

    /// Merge a fetch that ran elsewhere. The caller holds the round's guard.
    pub fn apply_sync<G: Rng + ?Sized>(
        &mut self,
        fetched: Result<Vec<Quote>>,
        rng: &mut G,
    ) -> Result<Outcome> {
        let report = apply_fetch(&mut self.store, fetched);
        self.after_sync(report, rng)
    }

    fn after_sync<G: Rng + ?Sized>(&mut self, report: SyncReport, rng: &mut G) -> Result<Outcome> {
        let mut outcome = if report.changed_store() {
            self.refreshed(rng)?
        } else {
            Outcome::default()
        };
        outcome
            .notifications
            .push(report.notification(self.hide_after_ms));
        outcome.sync = Some(report);
        Ok(outcome)
    }

    fn show<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<QuoteDisplay> {
        let selected = self.selected_category()?;
        self.view.show(self.store.quotes(), &selected, rng)
    }

    /// Categories and a fresh quote after a mutation.
    fn refreshed<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Outcome> {
        Ok(Outcome {
            display: Some(self.show(rng)?),
            categories: Some(self.categories()),
            ..Outcome::default()
        })
    }

    /// Turn a user-level failure into a notification; storage failures bubble up.
    fn rejected(&self, err: QuoteError) -> Result<Outcome> {
        if err.is_storage() {
            return Err(err);
        }
        Ok(Outcome {
            notifications: vec![Notification::error(err.to_string(), self.hide_after_ms)],
            ..Outcome::default()
        })
    }
}
