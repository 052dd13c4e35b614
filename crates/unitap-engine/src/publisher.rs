//! The live tap feed, backed by [`tokio::sync::broadcast`].

use serde::Serialize;
use tokio::sync::broadcast;
use unitap_core::{ledger::LedgerEntry, tap::TapEvent};

/// One committed tap as seen by feed subscribers: the event plus the
/// point delta it produced.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
  pub event:  TapEvent,
  pub ledger: LedgerEntry,
}

/// Fan-out of committed taps. Best-effort and at-most-once: a lagging
/// subscriber is dropped by the channel rather than slowing commits, and
/// there is no replay buffer — reconnecting clients re-fetch snapshots.
pub struct Publisher {
  tx: broadcast::Sender<FeedItem>,
}

impl Publisher {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<FeedItem> {
    self.tx.subscribe()
  }

  /// Publish one committed tap. Send order is commit order — the router
  /// calls this while still holding the context lock.
  pub fn publish(&self, item: FeedItem) {
    // Err means no live subscribers, which is fine.
    let _ = self.tx.send(item);
  }
}
