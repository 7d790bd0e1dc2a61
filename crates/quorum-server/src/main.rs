//! quorum-server binary.
//!
//! Reads `quorum.toml` (or the path specified with `--config`) layered under
//! `QUORUM_*` environment variables, opens the SQLite store, and serves the
//! API and session endpoints over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use quorum_server::{AppState, ServerConfig};
use quorum_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// How often expired session tokens are dropped.
const TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(author, version, about = "Quorum Q&A voting server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "quorum.toml")]
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

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("QUORUM"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if server_cfg.local_sign_in {
    tracing::warn!(
      "local sign-in is enabled: POST /session trusts any claimed uid"
    );
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let origin = server_cfg.origin.clone();
  let state = AppState::new(Arc::new(store), server_cfg)
    .with_context(|| format!("invalid origin {origin:?}"))?;

  let provider = Arc::clone(&state.provider);
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(TOKEN_PURGE_INTERVAL);
    loop {
      ticker.tick().await;
      let purged = provider.purge_expired();
      if purged > 0 {
        tracing::debug!(purged, "expired session tokens dropped");
      }
    }
  });

  let app = quorum_server::router(state);

  tracing::info!("Listening on http://{address} (public origin {origin})");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

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
