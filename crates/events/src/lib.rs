//! # Custodia Events
//!
//! This crate defines the ledger event structures that flow from the balance
//! ledger to its side-effect consumers (the time-bucketed analytics log).
//!
//! As a Layer 0 crate, it depends only on `core-types` and provides the
//! definitive language for balance movements.

// Declare the modules that make up this crate.
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use messages::{LedgerEvent, LedgerEventKind};
