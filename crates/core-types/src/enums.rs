use serde::{Deserialize, Serialize};

use crate::structs::Address;

/// The direction of a rollover cycle batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleDirection {
    Deposit,
    Withdraw,
}

impl CycleDirection {
    /// Returns the opposite direction of the cycle.
    pub fn opposite(&self) -> Self {
        match self {
            CycleDirection::Deposit => CycleDirection::Withdraw,
            CycleDirection::Withdraw => CycleDirection::Deposit,
        }
    }
}

/// An explicit capability passed into privileged ledger and engine APIs.
///
/// The hosting environment decides who the caller is and hands the matching
/// capability in, instead of the component inspecting an ambient caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Caller {
    /// The fund owner. Required for strategy and controller registration.
    Owner,
    /// A registered strategy acting on pooled funds it manages.
    Strategy(Address),
    /// A depositor.
    User(Address),
}

/// The failure taxonomy shared by every crate in the workspace.
///
/// Each crate's error enum maps into one of these classes via a `kind()`
/// method, so callers can branch on the class without matching every
/// concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Invalid or missing signature, unknown controller, wrong capability.
    Authorization,
    /// Strategy inactive or paused, insufficient balance.
    StateGate,
    /// No healthy endpoint, no configured endpoint.
    Availability,
    /// Invalid registration target, malformed settings.
    Config,
}
