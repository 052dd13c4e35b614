//! Handlers for the tap ingestion and feed endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/tap` | Body: `{"device_id","card_uid"}`; 201 commit / 200 duplicate |
//! | `GET`  | `/tap-events` | Optional `?limit=`, `?user_id=`, `?action=`; newest first |
//! | `GET`  | `/stream/taps` | SSE feed of committed taps, `event: tap` |

use std::{convert::Infallible, sync::Arc};

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::{
    IntoResponse,
    sse::{Event, KeepAlive, Sse},
  },
};
use chrono::Utc;
use futures::Stream;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use unitap_core::{
  store::TapStore,
  tap::{TapAction, TapEvent, TapEventQuery, TapOutcome},
};
use unitap_engine::Engine;
use uuid::Uuid;

use crate::error::ApiError;

const EVENTS_DEFAULT_LIMIT: usize = 50;
const EVENTS_MAX_LIMIT: usize = 200;

// ─── Tap ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TapBody {
  pub device_id: String,
  pub card_uid:  String,
}

/// `POST /tap` — route one tap through the engine.
///
/// A fresh commit returns 201; the idempotent `already_checked_in`
/// outcome returns 200. Rejections become 404/409 error bodies.
pub async fn tap<S>(
  State(engine): State<Arc<Engine<S>>>,
  Json(body): Json<TapBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let outcome = engine
    .route(&body.device_id, &body.card_uid, Utc::now())
    .await
    .map_err(ApiError::from_engine)?;

  let status = match &outcome {
    TapOutcome::Committed { .. } => StatusCode::CREATED,
    TapOutcome::AlreadyCheckedIn { .. } => StatusCode::OK,
  };
  Ok((status, Json(outcome)))
}

// ─── Event log ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EventsParams {
  pub limit:   Option<usize>,
  pub user_id: Option<Uuid>,
  pub action:  Option<TapAction>,
}

/// `GET /tap-events[?limit=][&user_id=][&action=]`
pub async fn events<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<EventsParams>,
) -> Result<Json<Vec<TapEvent>>, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let limit = params
    .limit
    .unwrap_or(EVENTS_DEFAULT_LIMIT)
    .min(EVENTS_MAX_LIMIT);
  let events = engine
    .store()
    .tap_events(&TapEventQuery {
      limit:   Some(limit),
      user_id: params.user_id,
      action:  params.action,
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(events))
}

// ─── Live feed ───────────────────────────────────────────────────────────────

/// `GET /stream/taps` — Server-Sent Events feed of committed taps.
///
/// Items arrive in commit order. The feed is best-effort: a client that
/// lags far enough to be dropped by the broadcast channel silently skips
/// ahead, and reconnecting clients are expected to re-fetch snapshots.
pub async fn stream<S>(
  State(engine): State<Arc<Engine<S>>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rx = engine.subscribe();
  let stream = futures::stream::unfold(rx, |mut rx| async move {
    loop {
      match rx.recv().await {
        Ok(item) => match Event::default().event("tap").json_data(&item) {
          Ok(event) => return Some((Ok(event), rx)),
          // Unserialisable feed item; skip it rather than kill the feed.
          Err(_) => continue,
        },
        // Lagged: older items were dropped, keep going from here.
        Err(RecvError::Lagged(_)) => continue,
        Err(RecvError::Closed) => return None,
      }
    }
  });
  Sse::new(stream).keep_alive(KeepAlive::default())
}
