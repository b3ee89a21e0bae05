use anyhow::Context;
use callmark_directory::{DirectoryStore, DEFAULT_LOOKUP_TIMEOUT};
use callmark_overlay::{OverlayTimings, DEFAULT_APP_NAME, DEFAULT_AUTO_DISMISS, DEFAULT_PRESENT_DELAY};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Shows who is calling on top of whatever is on screen.
#[derive(Parser, Debug, Clone)]
#[command(name = "callmark", version, about = "Caller identification overlay daemon")]
pub struct Cli {
    /// Caller directory database
    #[arg(long, env = "CALLMARK_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Delay before a matched caller is shown
    #[arg(long, global = true, default_value_t = DEFAULT_PRESENT_DELAY.as_millis() as u64)]
    pub present_delay_ms: u64,

    /// How long a shown overlay stays up
    #[arg(long, global = true, default_value_t = DEFAULT_AUTO_DISMISS.as_millis() as u64)]
    pub auto_dismiss_ms: u64,

    /// Upper bound on a directory lookup during a call
    #[arg(long, global = true, default_value_t = DEFAULT_LOOKUP_TIMEOUT.as_millis() as u64)]
    pub lookup_timeout_ms: u64,

    /// Title shown on the overlay
    #[arg(long, global = true, default_value = DEFAULT_APP_NAME)]
    pub app_name: String,

    /// Start without overlay permission
    #[arg(long, global = true)]
    pub no_permission: bool,

    /// Record overlay windows instead of drawing them and print them on exit
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read call events as JSON lines from stdin (default)
    Run,
    /// Add or replace a caller
    Add {
        number: String,
        name: String,
        #[arg(long, default_value = "")]
        country_code: String,
        #[arg(long, default_value = "")]
        appointment: String,
        #[arg(long, default_value = "")]
        city: String,
        #[arg(long, default_value = "")]
        ios_row: String,
        /// Number this caller was stored under before
        #[arg(long)]
        rename_from: Option<String>,
    },
    /// Look up a caller
    Get { number: String },
    /// Remove a caller
    Remove { number: String },
    /// List all callers
    List,
    /// List stored numbers
    Numbers,
    /// Remove every caller
    Clear,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    pub fn db_path(&self) -> anyhow::Result<PathBuf> {
        self.db
            .clone()
            .or_else(DirectoryStore::default_path)
            .context("no data directory on this platform, pass --db")
    }

    pub fn timings(&self) -> OverlayTimings {
        OverlayTimings {
            present_delay: Duration::from_millis(self.present_delay_ms),
            auto_dismiss: Duration::from_millis(self.auto_dismiss_ms),
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

/// Open the directory, creating its parent directory first.
pub fn open_store(cli: &Cli) -> anyhow::Result<DirectoryStore> {
    let path = cli.db_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    DirectoryStore::open(&path)
        .with_context(|| format!("failed to open caller directory at {}", path.display()))
}
