//! Handler for `/cards/link`.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Deserialize;
use unitap_core::{card::normalize_uid, store::TapStore, user::User};
use unitap_engine::Engine;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LinkBody {
  pub user_id:  Uuid,
  pub card_uid: String,
}

/// `POST /cards/link` — associate a (normalised) card UID with a user.
///
/// Relinking a UID already held by someone else atomically revokes the
/// previous association; at any instant a UID maps to at most one user.
pub async fn link<S>(
  State(engine): State<Arc<Engine<S>>>,
  Json(body): Json<LinkBody>,
) -> Result<Json<User>, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let uid = normalize_uid(&body.card_uid);
  if uid.is_empty() {
    return Err(ApiError::BadRequest("card_uid must not be empty".into()));
  }

  engine
    .store()
    .get_user(body.user_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {}", body.user_id)))?;

  let user = engine
    .store()
    .link_card(body.user_id, &uid)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(user))
}
