//! Error types for `unitap-core`.
//!
//! Expected, user-facing tap rejections are *not* here — those are the
//! [`TapRejection`](crate::tap::TapRejection) value returned by the
//! transition logic. This enum covers programming-bug-class conditions
//! and serialization failures only.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// A context entity violated one of its structural invariants (e.g. an
  /// equipment queue containing the current holder). Never patched
  /// silently; surfaced as an internal error.
  #[error("invariant violation in context {context_id}: {detail}")]
  InvariantViolation { context_id: Uuid, detail: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
