use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{Analytics, Endpoints, Fund, Settings, Signer};

/// Loads the application configuration from the `custodia.toml` file,
/// layered with `CUSTODIA_`-prefixed environment variables.
///
/// This function is the primary entry point for this crate. It reads the
/// configuration sources, deserializes them into our strongly-typed
/// `Settings` struct, and validates the result.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        // Tells the builder to look for a file named `custodia.toml`
        .add_source(config::File::with_name("custodia").required(false))
        // Environment overrides, e.g. CUSTODIA_SIGNER__SECRET.
        .add_source(config::Environment::with_prefix("CUSTODIA").separator("__"))
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;

    if settings.analytics.record_period_secs <= 0 {
        return Err(ConfigError::ValidationError(
            "analytics.record_period_secs must be positive".to_string(),
        ));
    }
    if settings.signer.secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "signer.secret must not be empty".to_string(),
        ));
    }

    Ok(settings)
}
