//! # Custodia Ledger Crate
//!
//! This crate is the authoritative store of who is owed what amount of which
//! token through which strategy. It defines the `Ledger` state machine and
//! the invariant it protects: for every `(token, strategy)` scope, the sum
//! of user balances equals the strategy total.
//!
//! ## Architectural Principles
//!
//! - **State vs. Custody Decoupling:** The ledger records attribution only.
//!   Actual token custody is an external collaborator that moves assets in
//!   lockstep with these calls; nothing here touches a token.
//! - **Explicit Capabilities:** Privileged operations take a `Caller`
//!   capability handed in by the host instead of inspecting an ambient
//!   caller. An unregistered strategy can never move funds, even if it
//!   previously held balances.
//! - **Events Out, Not Side Effects In:** Every mutation returns the
//!   `LedgerEvent`s it produced; the host forwards them to the analytics
//!   log. The ledger never writes anywhere else.
//!
//! ## Public API
//!
//! - `Ledger`: the in-memory balance state machine.
//! - `LedgerError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod accounts;
pub mod error;

// Re-export the key components to provide a clean, public-facing API.
pub use accounts::Ledger;
pub use error::LedgerError;
