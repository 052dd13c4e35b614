//! JSON REST API for UniTap.
//!
//! Exposes an axum [`Router`] backed by an [`Engine`] over any
//! [`unitap_core::store::TapStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", unitap_api::api_router(engine.clone()))
//! ```

pub mod attendance;
pub mod cards;
pub mod equipment;
pub mod error;
pub mod gamification;
pub mod stats;
pub mod taps;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use unitap_core::store::TapStore;
use unitap_engine::Engine;

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(engine: Arc<Engine<S>>) -> Router<()>
where
  S: TapStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Ingestion & feed
    .route("/tap",         post(taps::tap::<S>))
    .route("/tap-events",  get(taps::events::<S>))
    .route("/stream/taps", get(taps::stream::<S>))
    // Dashboard
    .route("/stats",  get(stats::stats::<S>))
    .route("/health", get(stats::health))
    // Gamification
    .route("/gamification/leaderboard", get(gamification::leaderboard::<S>))
    .route("/gamification/me",          get(gamification::me::<S>))
    // Attendance
    .route("/attendance/lectures",      get(attendance::list::<S>))
    .route("/attendance/lectures/{id}", get(attendance::get_one::<S>))
    // Equipment
    .route("/equipment",      get(equipment::list::<S>))
    .route("/equipment/{id}", get(equipment::get_one::<S>))
    .route(
      "/equipment/{id}/queue",
      post(equipment::join_queue::<S>).delete(equipment::leave_queue::<S>),
    )
    // Cards
    .route("/cards/link", post(cards::link::<S>))
    .with_state(engine)
}
