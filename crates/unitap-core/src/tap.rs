//! Tap events, outcomes, and rejections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::ledger::LedgerEntry;

// ─── Action ──────────────────────────────────────────────────────────────────

/// The domain action a committed tap performed. The snake_case form is both
/// the wire representation and the `action` column discriminant.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TapAction {
  Attendance,
  EquipmentCheckout,
  EquipmentReturn,
  EventCheckin,
}

// ─── TapEvent ────────────────────────────────────────────────────────────────

/// The append-only audit record of one accepted tap. Created exactly once
/// per committed decision; immutable thereafter; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapEvent {
  pub tap_id:     Uuid,
  pub user_id:    Uuid,
  /// Denormalised for the live feed — dashboards render names without a
  /// second lookup.
  pub user_name:  String,
  pub device_id:  String,
  pub action:     TapAction,
  pub context_id: Uuid,
  pub context_label: String,
  pub timestamp:  DateTime<Utc>,
  /// True iff this tap was the first successful check-in for its context
  /// instance. At most one TapEvent per context carries it.
  pub is_first_arrival: bool,
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// The successful result of routing a tap.
///
/// `AlreadyCheckedIn` is not an error: a double-tap or a retried request
/// lands here as an idempotent no-op, distinguished so the caller can show
/// "already done" instead of "done now".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TapOutcome {
  Committed {
    event:  TapEvent,
    ledger: LedgerEntry,
  },
  AlreadyCheckedIn {
    action:        TapAction,
    context_label: String,
  },
}

// ─── Rejection ───────────────────────────────────────────────────────────────

/// An expected, user-facing reason a tap was not applied. Rejections
/// produce no TapEvent and no point change; the device shows a non-fatal
/// message and the platform keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum TapRejection {
  /// No user is linked to this card UID.
  UnknownCard { card_uid: String },
  /// The reader is not registered.
  UnknownDevice { device_id: String },
  /// No context is live for this device right now (tap outside any
  /// lecture/event window, unit in maintenance, or an ambiguous schedule).
  NoActiveContext,
  /// Event check-in attempted without a registration.
  NotRegistered,
  /// The unit is checked out by someone else; tapping never transfers
  /// possession.
  UnitBusy,
}

impl TapRejection {
  /// Human-readable message for the device display / error body.
  pub fn message(&self) -> String {
    match self {
      Self::UnknownCard { card_uid } => {
        format!("card {card_uid} is not registered")
      }
      Self::UnknownDevice { device_id } => {
        format!("device {device_id} is not registered")
      }
      Self::NoActiveContext => "no active context for this device".into(),
      Self::NotRegistered => "not registered for this event".into(),
      Self::UnitBusy => "unit is checked out by another user".into(),
    }
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

///// Parameters for [`crate::store::TapStore::tap_events`].
#[derive(Debug, Clone, Default)]
pub struct TapEventQuery {
  pub limit:   Option<usize>,
  pub user_id: Option<Uuid>,
  pub action:  Option<TapAction>,
}
