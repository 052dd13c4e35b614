//! SQLite backend for the UniTap tap store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Tap commits execute as a
//! single SQL transaction, which is what makes the router's per-context
//! read-modify-write all-or-nothing.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
