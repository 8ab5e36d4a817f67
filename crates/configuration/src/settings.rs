use core_types::Address;
use serde::Deserialize;
use std::collections::HashMap;

/// The root configuration structure for the whole application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub fund: Fund,
    pub analytics: Analytics,
    pub endpoints: Endpoints,
    pub signer: Signer,
}

/// Identities of the fund's fixed roles.
#[derive(Debug, Clone, Deserialize)]
pub struct Fund {
    /// The ledger's own identity, rejected as a strategy registration target.
    pub ledger_address: Address,
}

/// Parameters of the time-bucketed analytics log.
#[derive(Debug, Clone, Deserialize)]
pub struct Analytics {
    /// Width of one reporting bucket in seconds.
    #[serde(default = "default_record_period_secs")]
    pub record_period_secs: i64,
}

fn default_record_period_secs() -> i64 {
    86_400
}

/// Execution endpoint candidates and probing bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
    /// Candidate RPC URLs per network name (e.g. "mainnet", "bsc").
    pub networks: HashMap<String, Vec<String>>,
    /// Upper bound on a single liveness probe, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}

/// The authorization credential. The secret is expected to come from the
/// environment (`CUSTODIA_SIGNER__SECRET`), not from the checked-in file.
#[derive(Debug, Clone, Deserialize)]
pub struct Signer {
    pub secret: String,
}
