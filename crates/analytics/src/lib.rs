//! # Custodia Analytics Log
//!
//! This crate keeps the time-bucketed history of balance movements used for
//! reporting: per-period deposit and withdraw sums, kept both per user and
//! aggregated per strategy manager.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of
//!   external systems. It depends only on `core-types` and `events`.
//! - **Side-Effect Consumer:** The tracker never originates data. It folds
//!   the `LedgerEvent`s the ledger emits into append-only buckets; replaying
//!   the same events rebuilds the same log.
//!
//! ## Public API
//!
//! - `BalanceTracker`: the bucketed log and its query operations.
//! - `TimeBucket`: one period's deposit/withdraw sums.
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod tracker;

// Re-export the key components to create a clean, public-facing API.
pub use error::AnalyticsError;
pub use tracker::{BalanceTracker, TimeBucket};
