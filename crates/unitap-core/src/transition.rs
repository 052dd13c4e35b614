//! The per-context transition state machine.
//!
//! [`apply_tap`] is the whole of the mode-specific routing decision: given
//! a committed context snapshot and a resolved user, it either produces the
//! updated context (plus the action taken), reports an idempotent
//! duplicate, or rejects the tap. It is a pure function — the engine wraps
//! it in the per-context lock and the atomic commit.

use uuid::Uuid;

use crate::{
  context::{Context, ContextBody, EquipmentStatus},
  tap::{TapAction, TapRejection},
};

/// The decision produced by [`apply_tap`].
#[derive(Debug, Clone)]
pub enum Transition {
  /// Apply `updated` atomically and record a TapEvent with `action`.
  Commit {
    action:           TapAction,
    is_first_arrival: bool,
    updated:          Context,
  },
  /// The user is already checked in / the state is already what the tap
  /// would make it. No TapEvent, no point award.
  Duplicate { action: TapAction },
}

/// Route one tap into `context` for `user_id`.
///
/// Takes the context by value and returns the updated copy inside
/// [`Transition::Commit`]; the caller owns making the swap atomic. Never
/// touches more than this one context.
pub fn apply_tap(
  context: Context,
  user_id: Uuid,
) -> Result<Transition, TapRejection> {
  let Context { context_id, device_id, body } = context;

  match body {
    // ── Lecture: {not-arrived, checked-in}, monotonic one-way ───────────
    ContextBody::Lecture(mut lecture) => {
      if lecture.checked_in.contains(&user_id) {
        return Ok(Transition::Duplicate { action: TapAction::Attendance });
      }
      let is_first_arrival = lecture.checked_in.is_empty();
      lecture.checked_in.insert(user_id);
      Ok(Transition::Commit {
        action: TapAction::Attendance,
        is_first_arrival,
        updated: Context {
          context_id,
          device_id,
          body: ContextBody::Lecture(lecture),
        },
      })
    }

    // ── Equipment: {available, in-use(holder)} at the unit level ────────
    ContextBody::Equipment(mut unit) => {
      let action = match (unit.status, unit.holder) {
        (EquipmentStatus::Maintenance, _) => {
          return Err(TapRejection::NoActiveContext);
        }
        // Checkout. A queued user who taps claims the unit and leaves the
        // queue; an unqueued user simply wins the race.
        (EquipmentStatus::Available, None) => {
          unit.status = EquipmentStatus::InUse;
          unit.holder = Some(user_id);
          unit.queue.retain(|q| *q != user_id);
          TapAction::EquipmentCheckout
        }
        // Return by the holder. The unit becomes available; the queue is
        // left intact — the head is offered the unit but must still tap
        // to claim it.
        (EquipmentStatus::InUse, Some(holder)) if holder == user_id => {
          unit.status = EquipmentStatus::Available;
          unit.holder = None;
          unit.checked_out_at = None;
          TapAction::EquipmentReturn
        }
        (EquipmentStatus::InUse, Some(_)) => {
          return Err(TapRejection::UnitBusy);
        }
        // holder/status disagree: the caller's invariant check surfaces
        // this as an internal error before we ever get here, but stay
        // total anyway.
        (EquipmentStatus::Available, Some(_))
        | (EquipmentStatus::InUse, None) => {
          return Err(TapRejection::NoActiveContext);
        }
      };
      Ok(Transition::Commit {
        action,
        is_first_arrival: false,
        updated: Context {
          context_id,
          device_id,
          body: ContextBody::Equipment(unit),
        },
      })
    }

    // ── Event: {registered-not-arrived, checked-in}, monotonic ──────────
    ContextBody::Event(mut session) => {
      if !session.registered.contains(&user_id) {
        return Err(TapRejection::NotRegistered);
      }
      if session.checked_in.contains(&user_id) {
        return Ok(Transition::Duplicate { action: TapAction::EventCheckin });
      }
      let is_first_arrival = session.checked_in.is_empty();
      session.checked_in.insert(user_id);
      Ok(Transition::Commit {
        action: TapAction::EventCheckin,
        is_first_arrival,
        updated: Context {
          context_id,
          device_id,
          body: ContextBody::Event(session),
        },
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;

  use chrono::{Duration, Utc};
  use uuid::Uuid;

  use super::{Transition, apply_tap};
  use crate::{
    context::{
      Context, ContextBody, EquipmentStatus, EquipmentUnit, EventSession,
      Lecture, TimeWindow,
    },
    tap::{TapAction, TapRejection},
  };

  fn window() -> TimeWindow {
    let start = Utc::now() - Duration::minutes(10);
    TimeWindow { start, end: start + Duration::hours(1) }
  }

  fn lecture_ctx(checked_in: &[Uuid]) -> Context {
    Context {
      context_id: Uuid::new_v4(),
      device_id:  "UNITAP-001".into(),
      body: ContextBody::Lecture(Lecture {
        name:           "Databases".into(),
        professor:      "Prof. Codd".into(),
        room:           "WBS 2.01".into(),
        expected_count: 30,
        checked_in:     checked_in.iter().copied().collect(),
        window:         window(),
      }),
    }
  }

  fn equipment_ctx(
    status: EquipmentStatus,
    holder: Option<Uuid>,
    queue:  Vec<Uuid>,
  ) -> Context {
    Context {
      context_id: Uuid::new_v4(),
      device_id:  "UNITAP-010".into(),
      body: ContextBody::Equipment(EquipmentUnit {
        name:           "3D Printer A".into(),
        location:       "Makerspace".into(),
        status,
        holder,
        queue,
        checked_out_at: None,
      }),
    }
  }

  fn event_ctx(registered: &[Uuid], checked_in: &[Uuid]) -> Context {
    Context {
      context_id: Uuid::new_v4(),
      device_id:  "UNITAP-020".into(),
      body: ContextBody::Event(EventSession {
        name:       "Robotics Social".into(),
        society:    "Robotics Society".into(),
        capacity:   50,
        registered: registered.iter().copied().collect(),
        checked_in: checked_in.iter().copied().collect(),
        window:     window(),
      }),
    }
  }

  // ── Lecture ───────────────────────────────────────────────────────────

  #[test]
  fn first_lecture_tap_is_first_arrival() {
    let user = Uuid::new_v4();
    let t = apply_tap(lecture_ctx(&[]), user).unwrap();
    match t {
      Transition::Commit { action, is_first_arrival, updated } => {
        assert_eq!(action, TapAction::Attendance);
        assert!(is_first_arrival);
        let ContextBody::Lecture(l) = updated.body else { panic!() };
        assert!(l.checked_in.contains(&user));
      }
      other => panic!("expected commit, got {other:?}"),
    }
  }

  #[test]
  fn second_user_is_not_first_arrival() {
    let first = Uuid::new_v4();
    let user = Uuid::new_v4();
    match apply_tap(lecture_ctx(&[first]), user).unwrap() {
      Transition::Commit { is_first_arrival, .. } => {
        assert!(!is_first_arrival);
      }
      other => panic!("expected commit, got {other:?}"),
    }
  }

  #[test]
  fn repeated_lecture_tap_is_duplicate() {
    let user = Uuid::new_v4();
    match apply_tap(lecture_ctx(&[user]), user).unwrap() {
      Transition::Duplicate { action } => {
        assert_eq!(action, TapAction::Attendance);
      }
      other => panic!("expected duplicate, got {other:?}"),
    }
  }

  // ── Equipment ─────────────────────────────────────────────────────────

  #[test]
  fn checkout_then_busy_then_return() {
    let holder = Uuid::new_v4();
    let intruder = Uuid::new_v4();

    let ctx = equipment_ctx(EquipmentStatus::Available, None, vec![]);
    let Transition::Commit { action, updated, .. } =
      apply_tap(ctx, holder).unwrap()
    else {
      panic!("expected commit");
    };
    assert_eq!(action, TapAction::EquipmentCheckout);

    // Someone else taps the in-use unit: rejected, no transfer.
    let err = apply_tap(updated.clone(), intruder).unwrap_err();
    assert_eq!(err, TapRejection::UnitBusy);

    // Holder taps again: return, available again.
    let Transition::Commit { action, updated, .. } =
      apply_tap(updated, holder).unwrap()
    else {
      panic!("expected commit");
    };
    assert_eq!(action, TapAction::EquipmentReturn);
    let ContextBody::Equipment(unit) = updated.body else { panic!() };
    assert_eq!(unit.status, EquipmentStatus::Available);
    assert_eq!(unit.holder, None);
  }

  #[test]
  fn queued_user_checkout_dequeues_them() {
    let queued = Uuid::new_v4();
    let other = Uuid::new_v4();
    let ctx =
      equipment_ctx(EquipmentStatus::Available, None, vec![queued, other]);

    let Transition::Commit { updated, .. } = apply_tap(ctx, queued).unwrap()
    else {
      panic!("expected commit");
    };
    let ContextBody::Equipment(unit) = updated.body else { panic!() };
    assert_eq!(unit.holder, Some(queued));
    assert_eq!(unit.queue, vec![other]);
  }

  #[test]
  fn return_keeps_queue_intact() {
    let holder = Uuid::new_v4();
    let queued = Uuid::new_v4();
    let ctx =
      equipment_ctx(EquipmentStatus::InUse, Some(holder), vec![queued]);

    let Transition::Commit { updated, .. } = apply_tap(ctx, holder).unwrap()
    else {
      panic!("expected commit");
    };
    let ContextBody::Equipment(unit) = updated.body else { panic!() };
    // The head of the queue is offered the unit, not handed it.
    assert_eq!(unit.holder, None);
    assert_eq!(unit.queue, vec![queued]);
  }

  #[test]
  fn maintenance_unit_rejects() {
    let user = Uuid::new_v4();
    let ctx = equipment_ctx(EquipmentStatus::Maintenance, None, vec![]);
    assert_eq!(
      apply_tap(ctx, user).unwrap_err(),
      TapRejection::NoActiveContext
    );
  }

  // ── Event ─────────────────────────────────────────────────────────────

  #[test]
  fn unregistered_user_rejected() {
    let registered = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let ctx = event_ctx(&[registered], &[]);
    assert_eq!(
      apply_tap(ctx, stranger).unwrap_err(),
      TapRejection::NotRegistered
    );
  }

  #[test]
  fn event_checkin_and_duplicate() {
    let user = Uuid::new_v4();
    let ctx = event_ctx(&[user], &[]);

    let Transition::Commit { action, is_first_arrival, updated } =
      apply_tap(ctx, user).unwrap()
    else {
      panic!("expected commit");
    };
    assert_eq!(action, TapAction::EventCheckin);
    assert!(is_first_arrival);

    match apply_tap(updated, user).unwrap() {
      Transition::Duplicate { action } => {
        assert_eq!(action, TapAction::EventCheckin);
      }
      other => panic!("expected duplicate, got {other:?}"),
    }
  }

  #[test]
  fn checked_in_stays_subset_of_registered() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let mut ctx = event_ctx(&[a, b], &[]);

    for user in [a, b] {
      match apply_tap(ctx.clone(), user).unwrap() {
        Transition::Commit { updated, .. } => ctx = updated,
        other => panic!("expected commit, got {other:?}"),
      }
    }

    let ContextBody::Event(session) = ctx.body else { panic!() };
    let expected: BTreeSet<_> = [a, b].into_iter().collect();
    assert_eq!(session.checked_in, expected);
    assert!(session.checked_in.is_subset(&session.registered));
  }
}
