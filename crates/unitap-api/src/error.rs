//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use unitap_core::tap::TapRejection;
use unitap_engine::Error as EngineError;

/// An error returned by an API handler.
///
/// Every variant renders as `{"error": {"code", "message"}}` so devices
/// and dashboards can branch on the code without parsing prose.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A tap (or queue operation) the engine refused for a domain reason.
  #[error("{}", .0.message())]
  Rejected(TapRejection),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Lift an engine error, erasing the store's concrete error type.
  pub fn from_engine<E>(error: EngineError<E>) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match error {
      EngineError::Rejected(r) => Self::Rejected(r),
      EngineError::UserNotFound(id) => Self::NotFound(format!("user {id}")),
      EngineError::ContextNotFound(id) => {
        Self::NotFound(format!("context {id}"))
      }
      EngineError::NotEquipment(id) => {
        Self::Conflict(format!("context {id} is not an equipment unit"))
      }
      EngineError::Invariant(e) => Self::Internal(Box::new(e)),
      EngineError::Store(e) => Self::Internal(Box::new(e)),
    }
  }

  /// Lift a bare store error from a read path.
  pub fn from_store<E>(error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Internal(Box::new(error))
  }

  fn code(&self) -> &'static str {
    match self {
      Self::Rejected(r) => match r {
        TapRejection::UnknownCard { .. } => "unknown_card",
        TapRejection::UnknownDevice { .. } => "unknown_device",
        TapRejection::NoActiveContext => "no_active_context",
        TapRejection::NotRegistered => "not_registered",
        TapRejection::UnitBusy => "unit_busy",
      },
      Self::NotFound(_) => "not_found",
      Self::BadRequest(_) => "bad_request",
      Self::Conflict(_) => "conflict",
      Self::Internal(_) => "internal",
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      // Identity failures are 404s; state conflicts are 409s.
      Self::Rejected(
        TapRejection::UnknownCard { .. } | TapRejection::UnknownDevice { .. },
      ) => StatusCode::NOT_FOUND,
      Self::Rejected(_) => StatusCode::CONFLICT,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = json!({
      "error": { "code": self.code(), "message": self.to_string() }
    });
    (self.status(), Json(body)).into_response()
  }
}
