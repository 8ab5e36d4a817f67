use crate::receipt::BatchState;
use controllers::ControllerError;
use core_types::{ControllerId, FailureKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Batch signature does not match the proposed steps")]
    InvalidSignature,

    #[error("Step {position} names unknown controller {controller_id:?}")]
    UnknownController {
        position: usize,
        controller_id: ControllerId,
    },

    #[error("Step {position} targets {controller_id:?} while the strategy is mid-rollover")]
    StrategyPaused {
        position: usize,
        controller_id: ControllerId,
    },

    #[error("Step {position} ({controller_id:?}) failed: {source}")]
    StepFailed {
        position: usize,
        controller_id: ControllerId,
        #[source]
        source: ControllerError,
    },

    #[error("Ledger settlement error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Operation requires the {required} capability")]
    Unauthorized { required: &'static str },
}

impl EngineError {
    /// The terminal batch state this failure corresponds to: a signature
    /// failure rejects the batch outright, everything later aborts it.
    pub fn terminal_state(&self) -> BatchState {
        match self {
            EngineError::InvalidSignature => BatchState::Rejected,
            _ => BatchState::Aborted,
        }
    }

    /// Maps this error into the workspace-wide failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::InvalidSignature
            | EngineError::UnknownController { .. }
            | EngineError::Unauthorized { .. } => FailureKind::Authorization,
            EngineError::StrategyPaused { .. } => FailureKind::StateGate,
            EngineError::StepFailed { source, .. } => match source {
                ControllerError::VenueUnreachable(_) => FailureKind::Availability,
                _ => FailureKind::StateGate,
            },
            EngineError::Ledger(e) => e.kind(),
        }
    }
}
