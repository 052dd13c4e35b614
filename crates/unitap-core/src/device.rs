//! Reader devices and their routing mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What a tap on this device is routed into.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceMode {
  Attendance,
  Equipment,
  Event,
}

/// A registered NFC reader. Created and reconfigured by admin action;
/// read-only to the engine apart from the `last_seen` refresh on each tap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
  /// Stable external identifier printed on the reader (e.g. `UNITAP-001`).
  pub device_id: String,
  pub name:      String,
  pub location:  String,
  pub mode:      DeviceMode,
  pub last_seen: Option<DateTime<Utc>>,
}
