use core_types::{Address, FailureKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Deposit amount must be positive, got {0}")]
    InvalidAmount(rust_decimal::Decimal),

    #[error("Strategy {0} is not available for deposits")]
    StrategyUnavailable(Address),

    #[error("Caller {0} is not an actively registered strategy")]
    InvalidStrategy(Address),

    #[error("Cannot register {0} as a strategy")]
    InvalidRegistration(Address),

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: String,
        available: String,
    },

    #[error("Operation requires the {required} capability")]
    Unauthorized { required: &'static str },
}

impl LedgerError {
    /// Maps this error into the workspace-wide failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            LedgerError::InvalidAmount(_)
            | LedgerError::StrategyUnavailable(_)
            | LedgerError::InvalidStrategy(_)
            | LedgerError::InsufficientBalance { .. } => FailureKind::StateGate,
            LedgerError::InvalidRegistration(_) => FailureKind::Config,
            LedgerError::Unauthorized { .. } => FailureKind::Authorization,
        }
    }
}
