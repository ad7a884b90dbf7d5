mod commands;
mod config;
mod remote;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    Service, cmd_add, cmd_categories, cmd_export, cmd_filter, cmd_import, cmd_list, cmd_show,
    cmd_sync, cmd_watch,
};
use crate::config::{Config, Overrides};
use crate::remote::HttpRemote;
use quotebook_core::db::Database;
use quotebook_core::store::QuoteStore;

#[derive(Parser)]
#[command(
    name = "quotebook",
    version,
    about = "Keep a collection of quotes, browse them by category, and sync with a server"
)]
struct Cli {
    /// Directory holding the quote database (default: platform data dir)
    #[arg(long, global = true, env = "QUOTEBOOK_DATA_DIR", value_name = "PATH")]
    data_dir: Option<PathBuf>,
    /// Server endpoint used for sync and push
    #[arg(long, global = true, env = "QUOTEBOOK_REMOTE_URL", value_name = "URL")]
    remote: Option<String>,
    /// Display time for notifications, reported as `hideAfterMs` in `--json` output.
    /// Text output prints each notification once.
    #[arg(long, global = true, env = "QUOTEBOOK_NOTIFY_MS", value_name = "MS")]
    notify_ms: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a random quote from the selected category
    Show {
        /// Show the last quote displayed this session instead
        #[arg(long)]
        last: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a quote and push it to the server
    Add {
        /// Quote text
        text: String,
        /// Category name
        category: String,
        /// Keep the quote local (skip the server push)
        #[arg(long)]
        offline: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored quotes
    List {
        /// Only quotes in this category
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List categories; the selected one is marked with `*`
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Select a category (`all` to clear) and show a quote from it
    Filter {
        /// Category name
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export all quotes to a JSON file
    Export {
        /// Destination file (default: ./quotes.json)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import quotes from a JSON file holding an array of quotes
    Import {
        /// Path to the JSON file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one sync round against the server
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive session with periodic sync
    Watch {
        /// Seconds between sync rounds (default: 60)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Serve a local quote endpoint that `sync` and `add` can talk to
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("QUOTEBOOK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&Overrides {
        data_dir: cli.data_dir,
        remote_url: cli.remote,
        notify_ms: cli.notify_ms,
    })?;
    debug!(data_dir = %config.data_dir.display(), "config loaded");

    match cli.command {
        Commands::Show { last, json } => cmd_show(&mut open_service(&config)?, last, json),
        Commands::Add {
            text,
            category,
            offline,
            json,
        } => {
            let remote = if offline {
                None
            } else {
                Some(HttpRemote::new(&config.remote_url)?)
            };
            let mut service = open_service(&config)?;
            cmd_add(&mut service, remote.as_ref(), &text, &category, json).await
        }
        Commands::List { category, json } => {
            cmd_list(&open_service(&config)?, category.as_deref(), json)
        }
        Commands::Categories { json } => cmd_categories(&open_service(&config)?, json),
        Commands::Filter { category, json } => {
            cmd_filter(&mut open_service(&config)?, &category, json)
        }
        Commands::Export { output, json } => {
            cmd_export(&mut open_service(&config)?, output.as_deref(), json).await
        }
        Commands::Import { file, json } => cmd_import(&mut open_service(&config)?, &file, json),
        Commands::Sync { json } => {
            let remote = HttpRemote::new(&config.remote_url)?;
            cmd_sync(&mut open_service(&config)?, &remote, json).await
        }
        Commands::Watch { interval } => {
            let remote = Arc::new(HttpRemote::new(&config.remote_url)?);
            let mut service = open_service(&config)?;
            let interval = config.with_sync_interval(interval).sync_interval;
            cmd_watch(&mut service, remote, interval).await
        }
        Commands::Serve { port, bind } => {
            let store = QuoteStore::load_empty(Database::open(&config.server_db_path)?)?;
            server::start_server(store, port, &bind).await
        }
    }
}

fn open_service(config: &Config) -> Result<Service> {
    let durable = Database::open(&config.db_path)?;
    let session = Database::open(&config.session_path)?;
    Ok(Service::open(durable, session, config.notify_ms)?)
}
