//! User identity and the derived gamification aggregate.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

// ─── Role ────────────────────────────────────────────────────────────────────

/// Platform role. The engine itself never branches on roles — authorization
/// is the caller's concern — but the role travels with the user record.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  #[default]
  Student,
  Professor,
  SocietyAdmin,
  ClassAdmin,
  Superuser,
}

// ─── User ────────────────────────────────────────────────────────────────────

/// A platform user. Gamification aggregates live in [`UserStats`], keyed by
/// the same `user_id`, and are mutated exclusively through the tap commit
/// path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  pub name:       String,
  pub email:      String,
  pub university: String,
  pub role:       Role,
  /// Normalised card UID; `None` until a card is linked. A UID maps to at
  /// most one user at any time.
  pub card_uid:   Option<String>,
  pub created_at: DateTime<Utc>,
}

// ─── Badges ──────────────────────────────────────────────────────────────────

/// A badge. The full set a user holds is a pure function of their
/// [`UserStats`] aggregates — see [`crate::ledger::badges_for`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Badge {
  EarlyBird,
  Streak3,
  Streak7,
  Streak30,
  Century,
  SocietyStar,
}

// ─── UserStats ───────────────────────────────────────────────────────────────

/// The per-user gamification aggregate: points, streaks, badges, and the
/// bookkeeping needed to apply taps idempotently.
///
/// Not independently authoritative — it must be reconstructable by folding
/// the user's full TapEvent history through [`crate::ledger::replay`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
  pub points:          i64,
  pub current_streak:  u32,
  pub best_streak:     u32,
  pub first_arrivals:  u32,
  pub event_checkins:  u32,
  /// Last calendar day with a qualifying tap (attendance or event
  /// check-in); the streak only moves once per day.
  pub last_qualifying_date: Option<NaiveDate>,
  /// Streak thresholds (3, 7, 30) whose one-off bonus has already been
  /// paid out. Prevents re-awarding on later days past the threshold.
  pub streak_bonuses_awarded: BTreeSet<u32>,
  pub badges: BTreeSet<Badge>,
}
