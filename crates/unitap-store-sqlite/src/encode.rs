//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings; calendar dates as ISO
//! dates. Enum discriminants use their strum snake_case forms. Structured
//! fields (context bodies, badge sets, bonus sets) are stored as compact
//! JSON. UUIDs are stored as hyphenated lowercase strings.

use std::{collections::BTreeSet, str::FromStr as _};

use chrono::{DateTime, NaiveDate, Utc};
use unitap_core::{
  context::{Context, ContextBody, ContextKind},
  device::{Device, DeviceMode},
  ledger::LedgerEntry,
  tap::{TapAction, TapEvent},
  user::{Badge, Role, User, UserStats},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  s.parse().map_err(|_| Error::DateParse(format!("bad date: {s:?}")))
}

// ─── Discriminants ───────────────────────────────────────────────────────────

pub fn decode_role(s: &str) -> Result<Role> {
  Role::from_str(s).map_err(|_| Error::Discriminant(s.to_owned()))
}

pub fn decode_mode(s: &str) -> Result<DeviceMode> {
  DeviceMode::from_str(s).map_err(|_| Error::Discriminant(s.to_owned()))
}

pub fn decode_kind(s: &str) -> Result<ContextKind> {
  ContextKind::from_str(s).map_err(|_| Error::Discriminant(s.to_owned()))
}

pub fn decode_action(s: &str) -> Result<TapAction> {
  TapAction::from_str(s).map_err(|_| Error::Discriminant(s.to_owned()))
}

// ─── JSON sets ───────────────────────────────────────────────────────────────

pub fn encode_badges(badges: &BTreeSet<Badge>) -> Result<String> {
  Ok(serde_json::to_string(badges)?)
}

pub fn decode_badges(s: &str) -> Result<BTreeSet<Badge>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_bonuses(bonuses: &BTreeSet<u32>) -> Result<String> {
  Ok(serde_json::to_string(bonuses)?)
}

pub fn decode_bonuses(s: &str) -> Result<BTreeSet<u32>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub name:       String,
  pub email:      String,
  pub university: String,
  pub role:       String,
  pub card_uid:   Option<String>,
  pub created_at: String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      name:       self.name,
      email:      self.email,
      university: self.university,
      role:       decode_role(&self.role)?,
      card_uid:   self.card_uid,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `user_stats` row.
pub struct RawStats {
  pub points:               i64,
  pub current_streak:       u32,
  pub best_streak:          u32,
  pub first_arrivals:       u32,
  pub event_checkins:       u32,
  pub last_qualifying_date: Option<String>,
  pub bonuses_json:         String,
  pub badges_json:          String,
}

impl RawStats {
  pub fn into_stats(self) -> Result<UserStats> {
    Ok(UserStats {
      points:               self.points,
      current_streak:       self.current_streak,
      best_streak:          self.best_streak,
      first_arrivals:       self.first_arrivals,
      event_checkins:       self.event_checkins,
      last_qualifying_date: self
        .last_qualifying_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      streak_bonuses_awarded: decode_bonuses(&self.bonuses_json)?,
      badges:                 decode_badges(&self.badges_json)?,
    })
  }
}

/// Raw strings read directly from a `devices` row.
pub struct RawDevice {
  pub device_id: String,
  pub name:      String,
  pub location:  String,
  pub mode:      String,
  pub last_seen: Option<String>,
}

impl RawDevice {
  pub fn into_device(self) -> Result<Device> {
    Ok(Device {
      device_id: self.device_id,
      name:      self.name,
      location:  self.location,
      mode:      decode_mode(&self.mode)?,
      last_seen: self.last_seen.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from a `contexts` row.
pub struct RawContext {
  pub context_id: String,
  pub device_id:  String,
  pub kind:       String,
  pub body_json:  String,
}

impl RawContext {
  pub fn into_context(self) -> Result<Context> {
    let kind = decode_kind(&self.kind)?;
    let data: serde_json::Value = serde_json::from_str(&self.body_json)?;
    Ok(Context {
      context_id: decode_uuid(&self.context_id)?,
      device_id:  self.device_id,
      body:       ContextBody::from_parts(kind, data)?,
    })
  }
}

/// Raw strings read directly from a `tap_events` row.
pub struct RawTapEvent {
  pub tap_id:           String,
  pub user_id:          String,
  pub user_name:        String,
  pub device_id:        String,
  pub action:           String,
  pub context_id:       String,
  pub context_label:    String,
  pub timestamp:        String,
  pub is_first_arrival: bool,
}

impl RawTapEvent {
  pub fn into_event(self) -> Result<TapEvent> {
    Ok(TapEvent {
      tap_id:           decode_uuid(&self.tap_id)?,
      user_id:          decode_uuid(&self.user_id)?,
      user_name:        self.user_name,
      device_id:        self.device_id,
      action:           decode_action(&self.action)?,
      context_id:       decode_uuid(&self.context_id)?,
      context_label:    self.context_label,
      timestamp:        decode_dt(&self.timestamp)?,
      is_first_arrival: self.is_first_arrival,
    })
  }
}

/// Raw strings read directly from a `ledger_entries` row.
pub struct RawLedgerEntry {
  pub tap_id:         String,
  pub user_id:        String,
  pub points_awarded: i64,
  pub streak_after:   u32,
  pub recorded_at:    String,
}

impl RawLedgerEntry {
  pub fn into_entry(self) -> Result<LedgerEntry> {
    Ok(LedgerEntry {
      tap_id:         decode_uuid(&self.tap_id)?,
      user_id:        decode_uuid(&self.user_id)?,
      points_awarded: self.points_awarded,
      streak_after:   self.streak_after,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}
