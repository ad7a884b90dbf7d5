use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quotebook_core::models::DEFAULT_NOTIFICATION_MS;
use quotebook_core::sync::DEFAULT_SYNC_INTERVAL;

pub const DEFAULT_REMOTE_URL: &str = "https://jsonplaceholder.typicode.com/posts";

/// Values given on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub remote_url: Option<String>,
    pub notify_ms: Option<u64>,
}

pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub session_path: PathBuf,
    pub server_db_path: PathBuf,
    pub remote_url: String,
    pub notify_ms: u64,
    pub sync_interval: Duration,
}

impl Config {
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let proj_dirs = ProjectDirs::from("", "", "quotebook");

        let data_dir = match (&overrides.data_dir, &proj_dirs) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dirs)) => dirs.data_dir().to_path_buf(),
            (None, None) => anyhow::bail!("Could not determine home directory"),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        // The runtime dir is wiped at logout, which is the session lifetime we want.
        let runtime_dir = proj_dirs.as_ref().and_then(ProjectDirs::runtime_dir);
        let session_dir = match (&overrides.data_dir, runtime_dir) {
            (Some(dir), _) => dir.join("session"),
            (None, Some(runtime)) => runtime.to_path_buf(),
            (None, None) => std::env::temp_dir().join("quotebook"),
        };

        Ok(Config {
            db_path: data_dir.join("quotebook.db"),
            session_path: session_dir.join("session.db"),
            server_db_path: data_dir.join("server.db"),
            data_dir,
            remote_url: overrides
                .remote_url
                .clone()
                .unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string()),
            notify_ms: overrides.notify_ms.unwrap_or(DEFAULT_NOTIFICATION_MS),
            sync_interval: DEFAULT_SYNC_INTERVAL,
        })
    }

    #[must_use]
    pub fn with_sync_interval(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs.filter(|s| *s > 0) {
            self.sync_interval = Duration::from_secs(secs);
        }
        self
    }

    /// Default destination for `export` in the current directory.
    pub fn default_export_path(file_name: &str) -> PathBuf {
        Path::new(".").join(file_name)
    }
}
