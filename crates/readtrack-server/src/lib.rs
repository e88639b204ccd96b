//! HTTP server wiring for the reading tracker: configuration and the
//! middleware stack around [`readtrack_api::api_router`].

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use axum::{
  Router,
  http::{HeaderValue, Method, header},
};
use chrono::TimeDelta;
use readtrack_api::{AppState, AuthSettings};
use readtrack_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `READTRACK_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  pub session_ttl_hours: i64,
  /// Adds `Secure` to the session cookie; enable behind TLS.
  pub secure_cookies:    bool,
  /// Browser origin allowed to call the API with credentials. No CORS
  /// headers are sent when unset.
  pub cors_origin:       Option<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              "127.0.0.1".to_string(),
      port:              3000,
      store_path:        PathBuf::from("readtrack.db"),
      session_ttl_hours: 24,
      secure_cookies:    false,
      cors_origin:       None,
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn auth_settings(&self) -> anyhow::Result<AuthSettings> {
    anyhow::ensure!(
      self.session_ttl_hours > 0,
      "session_ttl_hours must be positive, got {}",
      self.session_ttl_hours
    );
    let session_ttl = TimeDelta::try_hours(self.session_ttl_hours)
      .context("session_ttl_hours is too large")?;
    Ok(AuthSettings {
      session_ttl,
      secure_cookies: self.secure_cookies,
    })
  }
}

/// Layer the configuration sources: the optional TOML file first, then
/// `READTRACK_*` environment variables.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("READTRACK"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application ─────────────────────────────────────────────────────────────

/// The API router with request tracing and, when configured, CORS.
pub fn build_app(store: SqliteStore, config: &ServerConfig) -> anyhow::Result<Router> {
  let state = AppState::new(store, config.auth_settings()?);
  let mut app = readtrack_api::api_router(state).layer(TraceLayer::new_for_http());

  if let Some(origin) = &config.cors_origin {
    let origin = HeaderValue::from_str(origin)
      .with_context(|| format!("invalid cors_origin {origin:?}"))?;
    app = app.layer(
      CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    );
  }

  Ok(app)
}
