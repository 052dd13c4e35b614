//! The gamification ledger — a pure fold over committed TapEvents.
//!
//! Points, streaks, and badges are all derived state: [`apply`] folds one
//! event into a [`UserStats`] aggregate, and [`replay`] rebuilds the whole
//! aggregate from an empty one. The store keeps the folded aggregate for
//! fast reads, but the TapEvent log stays the source of truth — the two
//! must agree after any replay.
//!
//! Idempotency under at-least-once delivery is enforced one level up: the
//! store uses the TapEvent id as a dedup key, so applying the same event
//! twice never reaches this fold.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  tap::{TapAction, TapEvent},
  user::{Badge, UserStats},
};

// ─── Award table ─────────────────────────────────────────────────────────────

pub const XP_ATTENDANCE: i64 = 10;
/// First arrival replaces (does not stack with) the attendance award:
/// 25 total, not 35.
pub const XP_FIRST_ARRIVAL: i64 = 25;
pub const XP_EVENT_CHECKIN: i64 = 15;
pub const XP_EQUIPMENT_CHECKOUT: i64 = 5;

/// One-off bonuses paid the first time a streak reaches each length.
pub const STREAK_BONUSES: [(u32, i64); 3] = [(3, 20), (7, 50), (30, 200)];

// ─── LedgerEntry ─────────────────────────────────────────────────────────────

/// The recorded delta of applying one TapEvent. Keyed by `tap_id`, which is
/// also the idempotency key: a second application of the same event is a
/// no-op at the store layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
  pub tap_id:         Uuid,
  pub user_id:        Uuid,
  pub points_awarded: i64,
  pub streak_after:   u32,
  pub recorded_at:    DateTime<Utc>,
}

// ─── Fold ────────────────────────────────────────────────────────────────────

fn base_award(event: &TapEvent) -> i64 {
  match event.action {
    TapAction::Attendance if event.is_first_arrival => XP_FIRST_ARRIVAL,
    TapAction::Attendance => XP_ATTENDANCE,
    TapAction::EventCheckin => XP_EVENT_CHECKIN,
    TapAction::EquipmentCheckout => XP_EQUIPMENT_CHECKOUT,
    TapAction::EquipmentReturn => 0,
  }
}

fn is_qualifying(action: TapAction) -> bool {
  matches!(action, TapAction::Attendance | TapAction::EventCheckin)
}

/// Fold one committed TapEvent into `stats`.
///
/// Returns the updated aggregate and the ledger entry describing the
/// delta. The calendar day used for streak logic is the event's own
/// timestamp, so replays are reproducible regardless of when they run.
pub fn apply(stats: &UserStats, event: &TapEvent) -> (UserStats, LedgerEntry) {
  let mut next = stats.clone();
  let mut points = base_award(event);

  if event.is_first_arrival {
    next.first_arrivals += 1;
  }
  if event.action == TapAction::EventCheckin {
    next.event_checkins += 1;
  }

  // Streak: moves at most once per calendar day, driven by qualifying
  // taps only.
  if is_qualifying(event.action) {
    let today = event.timestamp.date_naive();
    if next.last_qualifying_date != Some(today) {
      let yesterday = today - Duration::days(1);
      next.current_streak = if next.last_qualifying_date == Some(yesterday) {
        next.current_streak + 1
      } else {
        1
      };
      next.last_qualifying_date = Some(today);
      next.best_streak = next.best_streak.max(next.current_streak);

      for (threshold, bonus) in STREAK_BONUSES {
        if next.current_streak >= threshold
          && next.streak_bonuses_awarded.insert(threshold)
        {
          points += bonus;
        }
      }
    }
  }

  next.points += points;
  // Recomputed wholesale, never patched incrementally, so the badge set
  // can't drift from the aggregates.
  next.badges = badges_for(&next);

  let entry = LedgerEntry {
    tap_id:         event.tap_id,
    user_id:        event.user_id,
    points_awarded: points,
    streak_after:   next.current_streak,
    recorded_at:    event.timestamp,
  };
  (next, entry)
}

/// Rebuild a user's aggregate from their full TapEvent history, oldest
/// first. Replaying the log of a live user must reproduce their stored
/// [`UserStats`] exactly.
pub fn replay<'a>(events: impl IntoIterator<Item = &'a TapEvent>) -> UserStats {
  events
    .into_iter()
    .fold(UserStats::default(), |stats, event| apply(&stats, event).0)
}

/// The badge set implied by an aggregate. Pure; order-independent.
pub fn badges_for(stats: &UserStats) -> std::collections::BTreeSet<Badge> {
  let mut badges = std::collections::BTreeSet::new();
  if stats.first_arrivals >= 1 {
    badges.insert(Badge::EarlyBird);
  }
  if stats.best_streak >= 3 {
    badges.insert(Badge::Streak3);
  }
  if stats.best_streak >= 7 {
    badges.insert(Badge::Streak7);
  }
  if stats.best_streak >= 30 {
    badges.insert(Badge::Streak30);
  }
  if stats.points >= 100 {
    badges.insert(Badge::Century);
  }
  if stats.event_checkins >= 5 {
    badges.insert(Badge::SocietyStar);
  }
  badges
}
