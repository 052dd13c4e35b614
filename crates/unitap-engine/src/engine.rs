//! [`Engine`] — the tap router.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use unitap_core::{
  card::normalize_uid,
  context::{Context, ContextBody},
  device::DeviceMode,
  ledger,
  store::TapStore,
  tap::{TapAction, TapEvent, TapOutcome, TapRejection},
  transition::{self, Transition},
  user::User,
};
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  locks::LockMap,
  publisher::{FeedItem, Publisher},
  registry::select_context,
};

/// Capacity of the broadcast feed. A subscriber this far behind is
/// dropped rather than allowed to slow commits.
const FEED_CAPACITY: usize = 256;

/// The routing engine, generic over the storage backend.
///
/// Shared behind an `Arc` by the HTTP layer; all methods take `&self`.
pub struct Engine<S> {
  store:     S,
  locks:     LockMap,
  publisher: Publisher,
}

impl<S: TapStore> Engine<S> {
  pub fn new(store: S) -> Self {
    Self {
      store,
      locks: LockMap::new(),
      publisher: Publisher::new(FEED_CAPACITY),
    }
  }

  /// Direct access to the backend, for read paths that bypass routing.
  pub fn store(&self) -> &S { &self.store }

  /// Subscribe to the live feed of committed taps, in commit order.
  pub fn subscribe(&self) -> broadcast::Receiver<FeedItem> {
    self.publisher.subscribe()
  }

  // ─── Routing ──────────────────────────────────────────────────────────

  /// Route one tap: resolve identity, select the live context, and apply
  /// the transition under the per-context lock.
  ///
  /// Rejections come back as [`Error::Rejected`] and write nothing.
  pub async fn route(
    &self,
    device_id: &str,
    card_uid:  &str,
    now:       DateTime<Utc>,
  ) -> Result<TapOutcome, S::Error> {
    // Identity first: an unknown card never touches context state.
    let uid = normalize_uid(card_uid);
    let user = self
      .store
      .resolve_card(&uid)
      .await
      .map_err(Error::Store)?
      .ok_or_else(|| {
        tracing::debug!(%device_id, card_uid = %uid, "unknown card");
        Error::Rejected(TapRejection::UnknownCard { card_uid: uid.clone() })
      })?;

    let device = self
      .store
      .get_device(device_id)
      .await
      .map_err(Error::Store)?
      .ok_or_else(|| {
        Error::Rejected(TapRejection::UnknownDevice {
          device_id: device_id.to_owned(),
        })
      })?;
    self
      .store
      .touch_device(device_id, now)
      .await
      .map_err(Error::Store)?;

    // Candidate selection outside the lock; re-checked inside.
    let contexts = self
      .store
      .contexts_for_device(device_id)
      .await
      .map_err(Error::Store)?;
    let candidate_id = select_context(&contexts, device.mode, now)
      .map(|c| c.context_id)
      .ok_or(Error::Rejected(TapRejection::NoActiveContext))?;

    let guard = self.locks.lock(candidate_id).await;
    let outcome = self
      .route_locked(candidate_id, &user, device.mode, device_id, now)
      .await;
    drop(guard);

    if let Ok(TapOutcome::Committed { event, .. }) = &outcome {
      tracing::info!(
        tap_id = %event.tap_id,
        user = %event.user_name,
        action = %event.action,
        context = %event.context_label,
        "tap committed"
      );
    }
    outcome
  }

  /// The critical section: re-read committed state, decide, commit,
  /// publish. Caller holds the context lock.
  async fn route_locked(
    &self,
    context_id: Uuid,
    user:       &User,
    mode:       DeviceMode,
    device_id:  &str,
    now:        DateTime<Utc>,
  ) -> Result<TapOutcome, S::Error> {
    // Re-read: the candidate may have been mutated or ended while we
    // waited on the lock. Selection is re-run against committed state.
    let context = self
      .store
      .get_context(context_id)
      .await
      .map_err(Error::Store)?
      .ok_or(Error::Rejected(TapRejection::NoActiveContext))?;
    let snapshot = std::slice::from_ref(&context);
    if select_context(snapshot, mode, now).is_none() {
      return Err(Error::Rejected(TapRejection::NoActiveContext));
    }

    if let Err(violation) = context.check_invariants() {
      tracing::error!(%context_id, error = %violation, "corrupt context state");
      return Err(Error::Invariant(violation));
    }

    let label = context.label();
    match transition::apply_tap(context, user.user_id)
      .map_err(Error::Rejected)?
    {
      Transition::Duplicate { action } => Ok(TapOutcome::AlreadyCheckedIn {
        action,
        context_label: label,
      }),
      Transition::Commit { action, is_first_arrival, mut updated } => {
        if action == TapAction::EquipmentCheckout
          && let ContextBody::Equipment(unit) = &mut updated.body
        {
          unit.checked_out_at = Some(now);
        }

        let event = TapEvent {
          tap_id: Uuid::new_v4(),
          user_id: user.user_id,
          user_name: user.name.clone(),
          device_id: device_id.to_owned(),
          action,
          context_id,
          context_label: label.clone(),
          timestamp: now,
          is_first_arrival,
        };

        let before = self
          .store
          .user_stats(user.user_id)
          .await
          .map_err(Error::Store)?;
        let (stats, entry) = ledger::apply(&before, &event);

        let applied = self
          .store
          .commit_tap(&updated, &event, &stats, &entry)
          .await
          .map_err(Error::Store)?;
        if !applied {
          // Fresh tap id collided with a committed one; treat as the
          // idempotent duplicate it is.
          return Ok(TapOutcome::AlreadyCheckedIn {
            action,
            context_label: label,
          });
        }

        // Publish while still holding the lock: feed order is commit
        // order, and no later tap on this context can overtake us.
        self.publisher.publish(FeedItem {
          event: event.clone(),
          ledger: entry.clone(),
        });

        Ok(TapOutcome::Committed { event, ledger: entry })
      }
    }
  }

  // ─── Queue membership ─────────────────────────────────────────────────

  /// Add `user_id` to a unit's waiting queue. Idempotent: joining twice,
  /// or while holding the unit, leaves the queue unchanged.
  pub async fn join_queue(
    &self,
    context_id: Uuid,
    user_id:    Uuid,
  ) -> Result<Context, S::Error> {
    self
      .store
      .get_user(user_id)
      .await
      .map_err(Error::Store)?
      .ok_or(Error::UserNotFound(user_id))?;

    let _guard = self.locks.lock(context_id).await;
    let mut context = self.unit_context(context_id).await?;

    let ContextBody::Equipment(unit) = &mut context.body else {
      return Err(Error::NotEquipment(context_id));
    };
    if unit.holder != Some(user_id) && !unit.queue.contains(&user_id) {
      unit.queue.push(user_id);
      self.store.put_context(&context).await.map_err(Error::Store)?;
      tracing::info!(%context_id, %user_id, "joined equipment queue");
    }
    Ok(context)
  }

  /// Remove `user_id` from a unit's waiting queue; a no-op when absent.
  pub async fn leave_queue(
    &self,
    context_id: Uuid,
    user_id:    Uuid,
  ) -> Result<Context, S::Error> {
    let _guard = self.locks.lock(context_id).await;
    let mut context = self.unit_context(context_id).await?;

    let ContextBody::Equipment(unit) = &mut context.body else {
      return Err(Error::NotEquipment(context_id));
    };
    let before = unit.queue.len();
    unit.queue.retain(|q| *q != user_id);
    if unit.queue.len() != before {
      self.store.put_context(&context).await.map_err(Error::Store)?;
      tracing::info!(%context_id, %user_id, "left equipment queue");
    }
    Ok(context)
  }

  async fn unit_context(&self, context_id: Uuid) -> Result<Context, S::Error> {
    self
      .store
      .get_context(context_id)
      .await
      .map_err(Error::Store)?
      .ok_or(Error::ContextNotFound(context_id))
  }
}
