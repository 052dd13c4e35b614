//! Handlers for `/stats` and `/health`.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::Utc;
use serde_json::{Value, json};
use unitap_core::store::{StatsSnapshot, TapStore};
use unitap_engine::Engine;

use crate::error::ApiError;

/// `GET /stats` — aggregate dashboard counters.
pub async fn stats<S>(
  State(engine): State<Arc<Engine<S>>>,
) -> Result<Json<StatsSnapshot>, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let snapshot = engine
    .store()
    .stats_snapshot(Utc::now())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(snapshot))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
  Json(json!({ "status": "ok" }))
}
