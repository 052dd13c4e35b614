//! Handlers for `/gamification` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/gamification/leaderboard` | `?period=all\|week`, `?limit=`, `?user_id=` for a `me` row |
//! | `GET` | `/gamification/me` | `?user_id=` required |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use unitap_core::store::{
  LeaderboardEntry, LeaderboardPeriod, Standing, TapStore,
};
use unitap_engine::Engine;
use uuid::Uuid;

use crate::error::ApiError;

const BOARD_DEFAULT_LIMIT: usize = 10;
const BOARD_MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct BoardParams {
  #[serde(default)]
  pub period:  LeaderboardPeriod,
  pub limit:   Option<usize>,
  /// When given, the response carries this user's own standing as `me`,
  /// whether or not they made the board.
  pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BoardResponse {
  pub entries: Vec<LeaderboardEntry>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub me:      Option<Standing>,
}

/// `GET /gamification/leaderboard[?period=all|week][&limit=][&user_id=]`
pub async fn leaderboard<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<BoardParams>,
) -> Result<Json<BoardResponse>, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let now = Utc::now();
  let limit = params
    .limit
    .unwrap_or(BOARD_DEFAULT_LIMIT)
    .min(BOARD_MAX_LIMIT);

  let entries = engine
    .store()
    .leaderboard(params.period, limit, now)
    .await
    .map_err(ApiError::from_store)?;

  let me = match params.user_id {
    Some(user_id) => engine
      .store()
      .standing(user_id, params.period, now)
      .await
      .map_err(ApiError::from_store)?,
    None => None,
  };

  Ok(Json(BoardResponse { entries, me }))
}

#[derive(Debug, Deserialize)]
pub struct MeParams {
  pub user_id: Uuid,
  #[serde(default)]
  pub period:  LeaderboardPeriod,
}

/// `GET /gamification/me?user_id=<id>[&period=all|week]`
pub async fn me<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<MeParams>,
) -> Result<Json<Standing>, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let standing = engine
    .store()
    .standing(params.user_id, params.period, Utc::now())
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {}", params.user_id)))?;
  Ok(Json(standing))
}
