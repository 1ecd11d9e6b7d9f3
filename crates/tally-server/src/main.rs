//! tally-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `TALLY_*`
//! environment variables, opens the SQLite ledger, starts the daily rollover
//! timer and serves the HTTP API.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tally_bot::{Ledger, SettingsCache};
use tally_core::clock::{Clock, SystemClock};
use tally_server::{
  AppState, ServerConfig, auth::AuthConfig, notices::NoticeOutbox, scheduler::Scheduler,
};
use tally_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tally ledger server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let raw = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("TALLY")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("admins"),
    )
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = raw
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  let settings = server_cfg.validate().context("invalid configuration")?;

  let store_path = expand_tilde(&settings.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let clock: Arc<dyn Clock> = Arc::new(SystemClock);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store.with_clock(clock.clone()));

  let cache = SettingsCache::new(store.clone(), settings.defaults, settings.admins.clone());
  let ledger = Arc::new(Ledger::new(store, cache, clock.clone(), settings.ledger.clone()));

  let notices = Arc::new(NoticeOutbox::default());
  if settings.scheduler_enabled {
    Scheduler::new(ledger.clone(), settings.schedule, notices.clone(), clock.now())
      .context("failed to resolve rollover schedule")?
      .spawn(clock.clone());
  } else {
    tracing::info!("rollover timer disabled");
  }

  let state = AppState {
    ledger,
    auth: Arc::new(AuthConfig { access_token: settings.access_token.clone() }),
    notices,
  };
  let app = tally_server::router(state);

  tracing::info!("Listening on http://{}", settings.address);
  let listener = TcpListener::bind(&settings.address)
    .await
    .with_context(|| format!("failed to bind {}", settings.address))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
