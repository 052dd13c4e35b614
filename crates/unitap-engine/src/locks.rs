//! The per-context lock map.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per context id, created lazily on first use.
///
/// Entries are never removed; the set of live contexts is small (one per
/// scheduled lecture, unit, or event) and a stale entry costs one Arc.
#[derive(Default)]
pub struct LockMap {
  inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl LockMap {
  pub fn new() -> Self { Self::default() }

  /// Acquire the lock for `context_id`, waiting behind any tap already
  /// routing into the same context.
  pub async fn lock(&self, context_id: Uuid) -> OwnedMutexGuard<()> {
    let entry = {
      let mut map = self.inner.lock().await;
      Arc::clone(map.entry(context_id).or_default())
    };
    entry.lock_owned().await
  }
}
