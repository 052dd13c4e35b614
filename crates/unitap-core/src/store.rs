//! The `TapStore` trait and supporting query/report types.
//!
//! The trait is implemented by storage backends (e.g.
//! `unitap-store-sqlite`). Higher layers (`unitap-engine`, `unitap-api`)
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  context::{Context, ContextBody, ContextKind},
  device::Device,
  ledger::LedgerEntry,
  tap::{TapEvent, TapEventQuery},
  user::{Role, User, UserStats},
};

// ─── Input types ─────────────────────────────────────────────────────────────

/// Input to [`TapStore::add_user`]. Card linking is a separate, atomic
/// operation.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:       String,
  pub email:      String,
  pub university: String,
  pub role:       Role,
}

/// Input to [`TapStore::add_context`]. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewContext {
  pub device_id: String,
  pub body:      ContextBody,
}

// ─── Leaderboard ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardPeriod {
  #[default]
  All,
  Week,
}

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
  pub user_id:        Uuid,
  pub name:           String,
  pub university:     String,
  pub points:         i64,
  pub current_streak: u32,
  pub best_streak:    u32,
  pub first_arrivals: u32,
  pub badges:         Vec<crate::user::Badge>,
  pub rank:           usize,
}

/// A single user's standing, for the "me" row alongside the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standing {
  #[serde(flatten)]
  pub entry:       LeaderboardEntry,
  pub total_users: usize,
}

// ─── Dashboard stats ─────────────────────────────────────────────────────────

/// Aggregate counters behind `GET /stats`, derived from committed state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
  pub taps_today:       u64,
  /// Checked-in over expected across today's lectures, as a whole
  /// percentage; all-time when no lecture is scheduled today.
  pub attendance_rate:  u32,
  pub active_queues:    u64,
  pub queue_students:   u64,
  pub events_this_week: u64,
  /// Distinct users who tapped today.
  pub active_students:  u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a UniTap storage backend.
///
/// The TapEvent log is strictly append-only, and the per-user aggregate
/// only ever changes through [`TapStore::commit_tap`] — there is no
/// direct stats write.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait TapStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users & cards ─────────────────────────────────────────────────────

  /// Create and persist a new user with no linked card.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Identity resolution: the user linked to this (normalised) card UID.
  /// `None` is a normal outcome the router turns into an `UnknownCard`
  /// rejection.
  fn resolve_card<'a>(
    &'a self,
    card_uid: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Link a (normalised) card UID to a user, atomically revoking any
  /// prior association — a UID maps to at most one user at any time.
  fn link_card<'a>(
    &'a self,
    user_id:  Uuid,
    card_uid: &'a str,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  /// The folded gamification aggregate; default (zeroed) for a user who
  /// has never tapped.
  fn user_stats(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<UserStats, Self::Error>> + Send + '_;

  // ── Devices ───────────────────────────────────────────────────────────

  fn add_device(
    &self,
    device: Device,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_device<'a>(
    &'a self,
    device_id: &'a str,
  ) -> impl Future<Output = Result<Option<Device>, Self::Error>> + Send + 'a;

  /// Refresh a device's `last_seen` timestamp (done on every tap).
  fn touch_device<'a>(
    &'a self,
    device_id: &'a str,
    now:       DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Contexts ──────────────────────────────────────────────────────────

  fn add_context(
    &self,
    input: NewContext,
  ) -> impl Future<Output = Result<Context, Self::Error>> + Send + '_;

  fn get_context(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Context>, Self::Error>> + Send + '_;

  /// All contexts attached to a device, any kind, any window. Selection
  /// of the active one is the registry's concern, not the store's.
  fn contexts_for_device<'a>(
    &'a self,
    device_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Context>, Self::Error>> + Send + 'a;

  fn list_contexts(
    &self,
    kind: Option<ContextKind>,
  ) -> impl Future<Output = Result<Vec<Context>, Self::Error>> + Send + '_;

  /// Overwrite one context's body. Only the queue join/leave path uses
  /// this; tap transitions go through [`TapStore::commit_tap`]. The
  /// caller holds the per-context lock.
  fn put_context<'a>(
    &'a self,
    context: &'a Context,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Tap commit ────────────────────────────────────────────────────────

  /// Commit one routed tap as a single all-or-nothing transaction: the
  /// updated context, the TapEvent, the ledger entry, and the user
  /// aggregate, together or not at all.
  ///
  /// Returns `false` — with no write whatsoever — when `event.tap_id`
  /// has already been committed; the tap id is the idempotency key that
  /// makes at-least-once delivery safe.
  fn commit_tap<'a>(
    &'a self,
    context: &'a Context,
    event:   &'a TapEvent,
    stats:   &'a UserStats,
    entry:   &'a LedgerEntry,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Recent TapEvents, newest first, filtered by `query`.
  fn tap_events<'a>(
    &'a self,
    query: &'a TapEventQuery,
  ) -> impl Future<Output = Result<Vec<TapEvent>, Self::Error>> + Send + 'a;

  /// One user's full TapEvent history, oldest first (replay order).
  fn tap_events_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TapEvent>, Self::Error>> + Send + '_;

  /// Ranked users. All-time ranks by the stored aggregate; weekly ranks
  /// by summing ledger awards over the trailing seven days from `now`.
  fn leaderboard(
    &self,
    period: LeaderboardPeriod,
    limit:  usize,
    now:    DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, Self::Error>> + Send + '_;

  /// One user's rank and totals under the same ordering as
  /// [`TapStore::leaderboard`].
  fn standing(
    &self,
    user_id: Uuid,
    period:  LeaderboardPeriod,
    now:     DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Standing>, Self::Error>> + Send + '_;

  /// The aggregate counters behind `GET /stats`.
  fn stats_snapshot(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<StatsSnapshot, Self::Error>> + Send + '_;
}
