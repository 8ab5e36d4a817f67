//! # Custodia Controller Contract
//!
//! This crate defines the contract every yield-source or swap integration
//! must satisfy to be driven by the rollover engine. It deliberately contains
//! no adapter implementations: stable-swap routers, AMM routers and yield
//! farms live outside the core and are registered against the engine by id.
//!
//! By using the `Controller` trait, the engine can dispatch an ordered batch
//! of cycle steps without knowing anything about the venue behind each step.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::ControllerError;

// Adapter implementations are registered under this id type; re-exported so
// they need not depend on core-types directly.
pub use core_types::ControllerId;

/// The venue-reported result of one executed cycle step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// The amount the adapter reports as moved, informational only; the
    /// ledger settles on the batch amount, not on adapter reports.
    pub moved: Decimal,
}

impl StepOutcome {
    pub fn new(moved: Decimal) -> Self {
        Self { moved }
    }
}

/// The contract a registered controller adapter implements.
///
/// The payload is opaque adapter-specific encoded arguments; the engine
/// passes it through untouched. Implementations must be `Send + Sync` so a
/// shared registry can dispatch to them from concurrent batches.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Deploys capital into the venue (the deposit-direction entry point,
    /// also used for swap legs of withdraw cycles).
    async fn deploy(&self, payload: &[u8]) -> Result<StepOutcome, ControllerError>;

    /// Pulls capital back out of the venue.
    async fn withdraw(&self, payload: &[u8]) -> Result<StepOutcome, ControllerError>;
}
