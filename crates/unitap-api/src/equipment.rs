//! Handlers for `/equipment` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/equipment` | All units |
//! | `GET`    | `/equipment/{id}` | Detail with the full queue |
//! | `POST`   | `/equipment/{id}/queue` | Body: `{"user_id"}`; idempotent join |
//! | `DELETE` | `/equipment/{id}/queue` | Body: `{"user_id"}`; no-op when absent |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unitap_core::{
  context::{Context, ContextBody, ContextKind, EquipmentStatus},
  store::TapStore,
};
use unitap_engine::Engine;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Views ───────────────────────────────────────────────────────────────────

/// One equipment unit as shown to dashboards.
#[derive(Debug, Serialize)]
pub struct UnitView {
  pub context_id:     Uuid,
  pub device_id:      String,
  pub name:           String,
  pub location:       String,
  pub status:         EquipmentStatus,
  pub holder:         Option<Uuid>,
  pub queue:          Vec<Uuid>,
  pub checked_out_at: Option<DateTime<Utc>>,
}

fn unit_view(context: &Context) -> Option<UnitView> {
  let ContextBody::Equipment(u) = &context.body else {
    return None;
  };
  Some(UnitView {
    context_id:     context.context_id,
    device_id:      context.device_id.clone(),
    name:           u.name.clone(),
    location:       u.location.clone(),
    status:         u.status,
    holder:         u.holder,
    queue:          u.queue.clone(),
    checked_out_at: u.checked_out_at,
  })
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /equipment`
pub async fn list<S>(
  State(engine): State<Arc<Engine<S>>>,
) -> Result<Json<Vec<UnitView>>, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let contexts = engine
    .store()
    .list_contexts(Some(ContextKind::Equipment))
    .await
    .map_err(ApiError::from_store)?;
  let mut views: Vec<UnitView> =
    contexts.iter().filter_map(unit_view).collect();
  views.sort_by(|a, b| a.name.cmp(&b.name));
  Ok(Json(views))
}

/// `GET /equipment/{id}`
pub async fn get_one<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<UnitView>, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let context = engine
    .store()
    .get_context(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("equipment unit {id}")))?;
  let view = unit_view(&context)
    .ok_or_else(|| ApiError::NotFound(format!("equipment unit {id}")))?;
  Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct QueueBody {
  pub user_id: Uuid,
}

/// `POST /equipment/{id}/queue` — join the waiting queue.
pub async fn join_queue<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<QueueBody>,
) -> Result<Json<UnitView>, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let context = engine
    .join_queue(id, body.user_id)
    .await
    .map_err(ApiError::from_engine)?;
  let view = unit_view(&context)
    .ok_or_else(|| ApiError::NotFound(format!("equipment unit {id}")))?;
  Ok(Json(view))
}

/// `DELETE /equipment/{id}/queue` — leave the waiting queue.
pub async fn leave_queue<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<QueueBody>,
) -> Result<Json<UnitView>, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let context = engine
    .leave_queue(id, body.user_id)
    .await
    .map_err(ApiError::from_engine)?;
  let view = unit_view(&context)
    .ok_or_else(|| ApiError::NotFound(format!("equipment unit {id}")))?;
  Ok(Json(view))
}
