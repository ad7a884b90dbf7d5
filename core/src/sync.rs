use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::KeyValueStore;
use crate::error::{QuoteError, Result};
use crate::models::{MergeSummary, Notification, Quote};
use crate::remote::RemoteQuotes;
use crate::store::QuoteStore;

pub const SYNC_SUCCESS_MESSAGE: &str = "Quotes synced with server!";
pub const NOTHING_FETCHED_MESSAGE: &str = "No quotes received from server.";
pub const SYNC_IN_PROGRESS_MESSAGE: &str = "Sync already in progress.";
pub const PUSH_SUCCESS_MESSAGE: &str = "Quote saved to server.";

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Idle,
    Syncing,
}

/// Serializes sync rounds: at most one is in flight at a time.
#[derive(Debug, Clone, Default)]
pub struct SyncAgent {
    syncing: Arc<AtomicBool>,
}

/// Held for the duration of a round. Dropping it returns the agent to idle.
#[derive(Debug)]
pub struct SyncGuard {
    syncing: Arc<AtomicBool>,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.syncing.store(false, Ordering::Release);
        debug!("sync agent idle");
    }
}

/// How a sync round ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncReport {
    Synced { summary: MergeSummary },
    NothingFetched,
    Failed { reason: String },
    AlreadyRunning,
}

impl SyncReport {
    #[must_use]
    pub fn notification(&self, hide_after_ms: u64) -> Notification {
        match self {
            Self::Synced { .. } => Notification::success(SYNC_SUCCESS_MESSAGE, hide_after_ms),
            Self::NothingFetched => Notification::info(NOTHING_FETCHED_MESSAGE, hide_after_ms),
            Self::Failed { reason } => Notification::error(
                format!("Failed to sync with server: {reason}"),
                hide_after_ms,
            ),
            Self::AlreadyRunning => Notification::info(SYNC_IN_PROGRESS_MESSAGE, hide_after_ms),
        }
    }

    #[must_use]
    pub fn changed_store(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

impl SyncAgent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        if self.syncing.load(Ordering::Acquire) {
            SyncState::Syncing
        } else {
            SyncState::Idle
        }
    }

    /// Move to `Syncing`, or `None` when a round is already running.
    #[must_use]
    pub fn try_begin(&self) -> Option<SyncGuard> {
        self.syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        debug!("sync agent syncing");
        Some(SyncGuard {
            syncing: Arc::clone(&self.syncing),
        })
    }

    /// Run a whole round against `store`: fetch, reconcile, persist.
    pub async fn run_round<S, R>(&self, store: &mut QuoteStore<S>, remote: &R) -> SyncReport
    where
        S: KeyValueStore,
        R: RemoteQuotes,
    {
        let Some(_guard) = self.try_begin() else {
            debug!("sync skipped, round already in flight");
            return SyncReport::AlreadyRunning;
        };
        let fetched = fetch_remote(remote).await;
        apply_fetch(store, fetched)
    }
}

/// Fetch step of a round, with transport failures mapped to `Network`.
pub async fn fetch_remote<R: RemoteQuotes>(remote: &R) -> Result<Vec<Quote>> {
    remote
        .fetch()
        .await
        .map_err(|e| QuoteError::Network(format!("{e:#}")))
}

/// Merge step of a round. Failures and empty fetches leave the store as it was.
pub fn apply_fetch<S: KeyValueStore>(
    store: &mut QuoteStore<S>,
    fetched: Result<Vec<Quote>>,
) -> SyncReport {
    let records = match fetched {
        Ok(records) => records,
        Err(e) => {
            warn!("sync fetch failed: {e}");
            return SyncReport::Failed {
                reason: e.to_string(),
            };
        }
    };

    if records.is_empty() {
        info!("sync fetched no remote quotes");
        return SyncReport::NothingFetched;
    }

    match store.merge_remote(records) {
        Ok(summary) => SyncReport::Synced { summary },
        Err(e) => {
            warn!("sync merge failed: {e:#}");
            SyncReport::Failed {
                reason: format!("{e:#}"),
            }
        }
    }
}

/// Send one newly created quote to the remote. Never touches the local store.
pub async fn push_quote<R: RemoteQuotes>(
    remote: &R,
    quote: &Quote,
    hide_after_ms: u64,
) -> Notification {
    match remote.push(quote).await {
        Ok(()) => {
            info!(id = ?quote.id, "pushed quote to server");
            Notification::success(PUSH_SUCCESS_MESSAGE, hide_after_ms)
        }
        Err(e) => {
            warn!(id = ?quote.id, "push failed: {e:#}");
            Notification::error(
                format!("Failed to save quote to server: {e:#}"),
                hide_after_ms,
            )
        }
    }
}
