use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from file: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

impl ConfigError {
    pub fn kind(&self) -> core_types::FailureKind {
        core_types::FailureKind::Config
    }
}
