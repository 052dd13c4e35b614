//! The tap-routing engine.
//!
//! Glue between the pure decision logic in `unitap-core` and a
//! [`TapStore`](unitap_core::store::TapStore) backend: per-context
//! serialization, the route/commit/publish pipeline, queue membership,
//! and the live broadcast feed.
//!
//! Concurrency model: one async mutex per context id. Taps on the same
//! context serialize; taps on different contexts never contend; there is
//! no global lock. Inside the lock the engine re-reads committed state,
//! runs the pure transition, commits in one store transaction, and
//! publishes to the feed before releasing — so feed order is commit
//! order.

mod engine;
mod locks;
mod publisher;
mod registry;

pub mod error;

pub use engine::Engine;
pub use error::Error;
pub use publisher::FeedItem;
pub use registry::select_context;
