use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::remote::HttpRemote;
use quotebook_core::error::Result as QuoteResult;
use quotebook_core::models::{ALL_CATEGORIES, Quote};
use quotebook_core::service::{Action, Effect};
use quotebook_core::sync::{SyncGuard, SyncReport, fetch_remote, push_quote};

use super::helpers::{print_notification, render_outcome};
use super::{Service, run_effects};

const WATCH_HELP: &str = "Commands: n (next quote), s (sync now), \
    c <category> (filter, `all` to clear), a <text> | <category> (add), q (quit)";

type FetchResult = (SyncGuard, QuoteResult<Vec<Quote>>);

pub(crate) async fn cmd_sync(service: &mut Service, remote: &HttpRemote, json: bool) -> Result<()> {
    let outcome = service.dispatch(Action::Sync, &mut rand::rng())?;
    run_effects(service, Some(remote), outcome.effects, None, json).await
}

/// A line typed into the interactive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WatchCommand {
    Next,
    Sync,
    Category(String),
    Add { text: String, category: String },
    Help,
    Quit,
}

pub(crate) fn parse_watch_command(line: &str) -> Option<WatchCommand> {
    let line = line.trim();
    let (head, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(h, r)| (h, r.trim()));

    match head {
        "n" | "next" => Some(WatchCommand::Next),
        "s" | "sync" => Some(WatchCommand::Sync),
        "q" | "quit" | "exit" => Some(WatchCommand::Quit),
        "h" | "help" | "?" => Some(WatchCommand::Help),
        "c" | "category" => Some(WatchCommand::Category(if rest.is_empty() {
            ALL_CATEGORIES.to_string()
        } else {
            rest.to_string()
        })),
        "a" | "add" => {
            // Validation happens in the store; a missing separator means an empty category.
            let (text, category) = rest.split_once('|').unwrap_or((rest, ""));
            Some(WatchCommand::Add {
                text: text.trim().to_string(),
                category: category.trim().to_string(),
            })
        }
        _ => None,
    }
}

/// Interactive loop: timer-driven sync plus commands from stdin.
///
/// Network calls run on spawned tasks; only the merge touches the store, on
/// this task, so input keeps being handled while a fetch is pending. Pushes
/// still in flight on exit are awaited so their result gets reported.
pub(crate) async fn cmd_watch(
    service: &mut Service,
    remote: Arc<HttpRemote>,
    interval: Duration,
) -> Result<()> {
    let hide_after_ms = service.hide_after_ms();
    let (tx, mut rx) = mpsc::channel::<FetchResult>(4);
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pushes = JoinSet::new();

    info!(url = remote.url(), interval_secs = interval.as_secs(), "watching");
    let outcome = service.dispatch(Action::Restore, &mut rand::rng())?;
    render_outcome(&outcome, false)?;
    eprintln!("{WATCH_HELP}");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                debug!("sync timer fired");
                start_sync(service, &remote, &tx);
            }
            Some((guard, fetched)) = rx.recv() => {
                let outcome = service.apply_sync(fetched, &mut rand::rng())?;
                drop(guard);
                render_outcome(&outcome, false)?;
            }
            Some(joined) = pushes.join_next(), if !pushes.is_empty() => {
                if let Err(e) = joined {
                    warn!("push task failed: {e}");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let action = match parse_watch_command(&line) {
                    Some(WatchCommand::Quit) => break,
                    Some(WatchCommand::Sync) => {
                        start_sync(service, &remote, &tx);
                        continue;
                    }
                    Some(WatchCommand::Help) | None => {
                        eprintln!("{WATCH_HELP}");
                        continue;
                    }
                    Some(WatchCommand::Next) => Action::ShowRandom,
                    Some(WatchCommand::Category(category)) => Action::SelectCategory(category),
                    Some(WatchCommand::Add { text, category }) => Action::Add { text, category },
                };
                let outcome = service.dispatch(action, &mut rand::rng())?;
                render_outcome(&outcome, false)?;
                for effect in outcome.effects {
                    if let Effect::Push(quote) = effect {
                        spawn_push(&mut pushes, &remote, quote, hide_after_ms);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drain_pushes(&mut pushes).await;
    Ok(())
}

fn start_sync(service: &Service, remote: &Arc<HttpRemote>, tx: &mpsc::Sender<FetchResult>) {
    let Some(guard) = service.agent().try_begin() else {
        print_notification(&SyncReport::AlreadyRunning.notification(service.hide_after_ms()));
        return;
    };
    let remote = Arc::clone(remote);
    let tx = tx.clone();
    tokio::spawn(async move {
        let fetched = fetch_remote(remote.as_ref()).await;
        // The receiver only goes away when the loop exits.
        let _ = tx.send((guard, fetched)).await;
    });
}

fn spawn_push(
    pushes: &mut JoinSet<()>,
    remote: &Arc<HttpRemote>,
    quote: Quote,
    hide_after_ms: u64,
) {
    let remote = Arc::clone(remote);
    pushes.spawn(async move {
        let notification = push_quote(remote.as_ref(), &quote, hide_after_ms).await;
        print_notification(&notification);
    });
}

/// Wait for outstanding pushes. The HTTP client timeout bounds the wait.
async fn drain_pushes(pushes: &mut JoinSet<()>) {
    if !pushes.is_empty() {
        eprintln!("Waiting for {} pending push(es)...", pushes.len());
    }
    while let Some(joined) = pushes.join_next().await {
        if let Err(e) = joined {
            warn!("push task failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::server::{AppState, build_router};
    use quotebook_core::db::Database;
    use quotebook_core::store::QuoteStore;

    #[tokio::test]
    async fn test_pending_pushes_finish_before_exit() {
        let store = Arc::new(Mutex::new(
            QuoteStore::load_empty(Database::open_in_memory().unwrap()).unwrap(),
        ));
        let app = build_router(AppState {
            store: Arc::clone(&store),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let remote = Arc::new(HttpRemote::new(&format!("http://{addr}/quotes")).unwrap());

        let mut pushes = JoinSet::new();
        for id in 1..=3 {
            let quote = Quote::new(id, format!("Quote {id}"), "Pending".into(), id);
            spawn_push(&mut pushes, &remote, quote, 3000);
        }
        drain_pushes(&mut pushes).await;

        assert!(pushes.is_empty());
        assert_eq!(store.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_watch_command("n"), Some(WatchCommand::Next));
        assert_eq!(parse_watch_command("  sync "), Some(WatchCommand::Sync));
        assert_eq!(parse_watch_command("q"), Some(WatchCommand::Quit));
        assert_eq!(parse_watch_command("?"), Some(WatchCommand::Help));
        assert_eq!(parse_watch_command("dance"), None);
        assert_eq!(parse_watch_command(""), None);
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(
            parse_watch_command("c Deep Thoughts"),
            Some(WatchCommand::Category("Deep Thoughts".to_string()))
        );
        assert_eq!(
            parse_watch_command("c"),
            Some(WatchCommand::Category(ALL_CATEGORIES.to_string()))
        );
    }

    #[test]
    fn test_parse_add() {
        assert_eq!(
            parse_watch_command("a Less is more | Design"),
            Some(WatchCommand::Add {
                text: "Less is more".to_string(),
                category: "Design".to_string(),
            })
        );
        assert_eq!(
            parse_watch_command("add no category"),
            Some(WatchCommand::Add {
                text: "no category".to_string(),
                category: String::new(),
            })
        );
    }
}
