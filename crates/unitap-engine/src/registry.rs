//! Context selection — which of a device's contexts should absorb a tap
//! right now.

use chrono::{DateTime, Duration, Utc};
use unitap_core::{
  context::{Context, ContextBody},
  device::DeviceMode,
};

/// Event check-in stays open this long past the window's nominal end;
/// lecture attendance does not get a grace period.
pub const EVENT_GRACE_MINUTES: i64 = 30;

/// Pick the unique live context for a device, or `None`.
///
/// Ambiguity is treated the same as absence: two overlapping lecture
/// windows on one reader is a scheduling mistake, and guessing between
/// them would misroute every tap, so the tap is refused instead.
pub fn select_context<'a>(
  contexts: &'a [Context],
  mode:     DeviceMode,
  now:      DateTime<Utc>,
) -> Option<&'a Context> {
  let mut matches = contexts.iter().filter(|c| match (&c.body, mode) {
    (ContextBody::Lecture(l), DeviceMode::Attendance) => {
      l.window.contains(now)
    }
    // A unit is bound 1:1 to its reader; liveness (maintenance) is the
    // transition's concern, not selection's.
    (ContextBody::Equipment(_), DeviceMode::Equipment) => true,
    (ContextBody::Event(e), DeviceMode::Event) => {
      e.window
        .contains_with_grace(now, Duration::minutes(EVENT_GRACE_MINUTES))
    }
    _ => false,
  });

  let first = matches.next()?;
  if matches.next().is_some() {
    return None;
  }
  Some(first)
}
