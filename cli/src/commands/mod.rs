mod helpers;
mod quote;
mod sync;
mod transfer;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::remote::HttpRemote;
use quotebook_core::db::Database;
use quotebook_core::service::{Effect, QuoteService};
use quotebook_core::sync::push_quote;

use helpers::{print_notification, render_outcome};

pub(crate) use quote::{cmd_add, cmd_categories, cmd_filter, cmd_list, cmd_show};
pub(crate) use sync::{cmd_sync, cmd_watch};
pub(crate) use transfer::{cmd_export, cmd_import};

/// Service wired to the on-disk durable and session stores.
pub(crate) type Service = QuoteService<Database, Database>;

/// Carry out the side effects requested by a dispatch.
///
/// `remote` is `None` when running offline; pushes are then skipped.
pub(super) async fn run_effects(
    service: &mut Service,
    remote: Option<&HttpRemote>,
    effects: Vec<Effect>,
    export_to: Option<&Path>,
    json: bool,
) -> Result<()> {
    for effect in effects {
        match effect {
            Effect::Push(quote) => {
                let Some(remote) = remote else {
                    info!("offline, not pushing quote");
                    continue;
                };
                let notification = push_quote(remote, &quote, service.hide_after_ms()).await;
                if json {
                    println!("{}", serde_json::to_string_pretty(&notification)?);
                } else {
                    print_notification(&notification);
                }
            }
            Effect::Sync => {
                let Some(remote) = remote else {
                    info!("offline, not syncing");
                    continue;
                };
                let outcome = service.sync(remote, &mut rand::rng()).await?;
                render_outcome(&outcome, json)?;
            }
            Effect::WriteExport {
                file_name,
                contents,
            } => {
                let path = export_to.map_or_else(
                    || Config::default_export_path(file_name),
                    Path::to_path_buf,
                );
                std::fs::write(&path, contents)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if json {
                    println!("{}", serde_json::json!({ "exported": path }));
                } else {
                    println!("Exported quotes to {}", path.display());
                }
            }
        }
    }
    Ok(())
}
