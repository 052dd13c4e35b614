//! Core types and trait definitions for the UniTap tap-routing engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.
//!
//! The pure decision logic lives here too: the per-context transition
//! state machine ([`transition`]) and the gamification fold ([`ledger`]).
//! Both are plain functions over owned values so they can be tested
//! without a store or an async runtime.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod card;
pub mod context;
pub mod device;
pub mod error;
pub mod ledger;
pub mod store;
pub mod tap;
pub mod transition;
pub mod user;

pub use error::{Error, Result};
