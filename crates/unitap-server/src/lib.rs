//! HTTP server assembly for UniTap.
//!
//! Owns runtime configuration and glues the [`unitap_api`] router onto an
//! [`Engine`] over the SQLite store. The binary in `main.rs` does the
//! process-level work (config file, tracing, listener).

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use unitap_core::store::TapStore;
use unitap_engine::Engine;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router: the JSON API under `/api`, with
/// request tracing.
pub fn router<S>(engine: Arc<Engine<S>>) -> Router
where
  S: TapStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .nest("/api", unitap_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ───────────────────────────────────────────────────────
