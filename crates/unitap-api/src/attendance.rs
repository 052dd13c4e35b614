//! Handlers for `/attendance` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/attendance/lectures` | Optional `?status=upcoming\|live\|ended` |
//! | `GET` | `/attendance/lectures/{id}` | Detail with attendee ids |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use unitap_core::{
  context::{Context, ContextBody, ContextKind, TimeWindow, WindowStatus},
  store::TapStore,
};
use unitap_engine::Engine;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Views ───────────────────────────────────────────────────────────────────

/// Dashboard summary of one lecture.
#[derive(Debug, Serialize)]
pub struct LectureView {
  pub context_id:       Uuid,
  pub name:             String,
  pub professor:        String,
  pub room:             String,
  pub expected_count:   u32,
  pub checked_in_count: usize,
  pub window:           TimeWindow,
  pub status:           WindowStatus,
}

/// Detail view: the summary plus who checked in.
#[derive(Debug, Serialize)]
pub struct LectureDetail {
  #[serde(flatten)]
  pub summary:   LectureView,
  pub attendees: Vec<Uuid>,
}

fn lecture_view(context: &Context) -> Option<LectureView> {
  let ContextBody::Lecture(l) = &context.body else {
    return None;
  };
  Some(LectureView {
    context_id:       context.context_id,
    name:             l.name.clone(),
    professor:        l.professor.clone(),
    room:             l.room.clone(),
    expected_count:   l.expected_count,
    checked_in_count: l.checked_in.len(),
    window:           l.window,
    status:           l.window.status(Utc::now()),
  })
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<WindowStatus>,
}

/// `GET /attendance/lectures[?status=<status>]`
pub async fn list<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<LectureView>>, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let contexts = engine
    .store()
    .list_contexts(Some(ContextKind::Lecture))
    .await
    .map_err(ApiError::from_store)?;

  let mut views: Vec<LectureView> =
    contexts.iter().filter_map(lecture_view).collect();
  if let Some(status) = params.status {
    views.retain(|v| v.status == status);
  }
  views.sort_by_key(|v| v.window.start);
  Ok(Json(views))
}

/// `GET /attendance/lectures/{id}`
pub async fn get_one<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<LectureDetail>, ApiError>
where
  S: TapStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let context = engine
    .store()
    .get_context(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("lecture {id}")))?;

  let ContextBody::Lecture(l) = &context.body else {
    return Err(ApiError::NotFound(format!("lecture {id}")));
  };
  let summary = lecture_view(&context)
    .ok_or_else(|| ApiError::NotFound(format!("lecture {id}")))?;
  Ok(Json(LectureDetail {
    summary,
    attendees: l.checked_in.iter().copied().collect(),
  }))
}
