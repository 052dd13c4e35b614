//! Error type for `unitap-engine`.

use thiserror::Error;
use unitap_core::tap::TapRejection;
use uuid::Uuid;

/// Engine failure, generic over the store's error type.
///
/// [`Error::Rejected`] is the expected, user-facing branch: the tap (or
/// queue operation) was refused for a domain reason, nothing was written,
/// and the platform keeps running. Everything else is an internal fault.
#[derive(Debug, Error)]
pub enum Error<E> {
  #[error("{}", .0.message())]
  Rejected(TapRejection),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("context not found: {0}")]
  ContextNotFound(Uuid),

  /// A queue operation addressed a context that is not an equipment unit.
  #[error("context {0} is not an equipment unit")]
  NotEquipment(Uuid),

  /// Committed state failed a structural invariant. Logged and surfaced,
  /// never patched.
  #[error("invariant violation: {0}")]
  Invariant(#[from] unitap_core::Error),

  #[error("store error: {0}")]
  Store(E),
}

pub type Result<T, E> = std::result::Result<T, Error<E>>;
