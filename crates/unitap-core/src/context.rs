//! Contexts — the live entities a tap is routed into.
//!
//! A context is polymorphic over three variants sharing one identity
//! (`context_id` + `device_id`). The variants are a closed sum type so the
//! mode-specific transition logic in [`crate::transition`] is statically
//! exhaustive — no open-ended subclassing.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Time windows ────────────────────────────────────────────────────────────

/// A half-open activity window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl TimeWindow {
  pub fn contains(&self, now: DateTime<Utc>) -> bool {
    self.start <= now && now < self.end
  }

  /// True within the window or up to `grace` past its nominal end.
  /// Event check-in stays open for stragglers; lectures do not.
  pub fn contains_with_grace(
    &self,
    now:   DateTime<Utc>,
    grace: chrono::Duration,
  ) -> bool {
    self.start <= now && now < self.end + grace
  }
}

/// Derived display status for windowed contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowStatus {
  Upcoming,
  Live,
  Ended,
}

impl TimeWindow {
  pub fn status(&self, now: DateTime<Utc>) -> WindowStatus {
    if now < self.start {
      WindowStatus::Upcoming
    } else if now < self.end {
      WindowStatus::Live
    } else {
      WindowStatus::Ended
    }
  }
}

// ─── Variants ────────────────────────────────────────────────────────────────

/// A scheduled lecture taking attendance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lecture {
  pub name:           String,
  pub professor:      String,
  pub room:           String,
  pub expected_count: u32,
  pub checked_in:     BTreeSet<Uuid>,
  pub window:         TimeWindow,
}

/// Operational state of an equipment unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
  Available,
  InUse,
  Maintenance,
}

/// A checkout-able equipment unit bound 1:1 to its reader device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentUnit {
  pub name:           String,
  pub location:       String,
  pub status:         EquipmentStatus,
  pub holder:         Option<Uuid>,
  /// Waiting users in FIFO order; never contains the holder or duplicates.
  pub queue:          Vec<Uuid>,
  pub checked_out_at: Option<DateTime<Utc>>,
}

/// A society event with registration and a check-in window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSession {
  pub name:       String,
  pub society:    String,
  pub capacity:   u32,
  pub registered: BTreeSet<Uuid>,
  pub checked_in: BTreeSet<Uuid>,
  pub window:     TimeWindow,
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Discriminant-only view of the context union, used for store filters.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContextKind {
  Lecture,
  Equipment,
  Event,
}

/// The variant payload of a [`Context`]. The serde tag doubles as the
/// `kind` discriminant stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ContextBody {
  Lecture(Lecture),
  Equipment(EquipmentUnit),
  Event(EventSession),
}

impl ContextBody {
  /// The discriminant stored in the `kind` column.
  pub fn kind(&self) -> ContextKind {
    match self {
      Self::Lecture(_) => ContextKind::Lecture,
      Self::Equipment(_) => ContextKind::Equipment,
      Self::Event(_) => ContextKind::Event,
    }
  }

  /// Serialise the inner payload (without the kind tag) for the
  /// `body_json` database column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    // The full serialised form is `{"kind": "...", "data": <payload>}`.
    // We want only the payload.
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Deserialise from the kind discriminant and JSON payload stored in
  /// the database.
  pub fn from_parts(kind: ContextKind, data: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "kind": kind, "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

/// A routable context: one lecture, equipment unit, or event session,
/// attached to the device whose taps it absorbs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
  pub context_id: Uuid,
  pub device_id:  String,
  pub body:       ContextBody,
}

impl Context {
  /// Human-readable label carried on every TapEvent, e.g.
  /// `"Databases — WBS 2.01"`.
  pub fn label(&self) -> String {
    match &self.body {
      ContextBody::Lecture(l) => format!("{} — {}", l.name, l.room),
      ContextBody::Equipment(e) => format!("{} — {}", e.name, e.location),
      ContextBody::Event(e) => format!("{} — {}", e.name, e.society),
    }
  }

  /// Verify the per-variant structural invariants.
  ///
  /// A failure here is a programming bug, not bad input: committed state
  /// must always satisfy these. The router checks before committing and
  /// surfaces a violation as an internal error rather than patching it.
  pub fn check_invariants(&self) -> Result<()> {
    let fail = |detail: String| {
      Err(Error::InvariantViolation { context_id: self.context_id, detail })
    };

    match &self.body {
      ContextBody::Lecture(_) => Ok(()),
      ContextBody::Equipment(e) => {
        match (e.status, e.holder) {
          (EquipmentStatus::InUse, None) => {
            return fail("in-use unit has no holder".into());
          }
          (EquipmentStatus::Available | EquipmentStatus::Maintenance, Some(h)) => {
            return fail(format!("idle unit has holder {h}"));
          }
          _ => {}
        }
        if let Some(h) = e.holder
          && e.queue.contains(&h)
        {
          return fail(format!("queue contains current holder {h}"));
        }
        let unique: BTreeSet<_> = e.queue.iter().collect();
        if unique.len() != e.queue.len() {
          return fail("queue contains duplicates".into());
        }
        Ok(())
      }
      ContextBody::Event(e) => {
        if !e.checked_in.is_subset(&e.registered) {
          return fail("checked_in is not a subset of registered".into());
        }
        Ok(())
      }
    }
  }
}
