use core_types::FailureKind;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthorizerError {
    #[error("No endpoint in config for network '{0}'")]
    NoConfiguredEndpoint(String),

    #[error("No endpoint alive for network '{0}'")]
    NoHealthyEndpoint(String),

    #[error("Endpoint {url} is not answering: {reason}")]
    ProbeFailed { url: String, reason: String },

    #[error("Endpoint {url} returned an unusable block height: {raw}")]
    InvalidHeight { url: String, raw: String },

    /// The shared outcome of a coalesced execution another caller led.
    #[error("{0}")]
    Coalesced(Arc<AuthorizerError>),
}

impl AuthorizerError {
    /// Maps this error into the workspace-wide failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            AuthorizerError::NoConfiguredEndpoint(_) => FailureKind::Config,
            AuthorizerError::NoHealthyEndpoint(_)
            | AuthorizerError::ProbeFailed { .. }
            | AuthorizerError::InvalidHeight { .. } => FailureKind::Availability,
            AuthorizerError::Coalesced(inner) => inner.kind(),
        }
    }
}
