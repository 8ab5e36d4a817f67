use crate::error::AuthorizerError;
use configuration::Endpoints;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One endpoint's probe result: how far behind it is and how fast it answered.
/// Produced fresh per selection call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidate {
    pub url: String,
    pub latency: Duration,
    pub height: u64,
}

#[derive(Deserialize)]
struct BlockNumberResponse {
    result: Option<BlockHead>,
}

#[derive(Deserialize)]
struct BlockHead {
    number: String,
}

/// Probes a network's candidate execution endpoints and picks the best one.
///
/// Authorization must never be routed through a lagging endpoint, so
/// candidates below the maximum observed block height are discarded before
/// latency is even considered.
pub struct EndpointSelector {
    networks: HashMap<String, Vec<String>>,
    probe_timeout: Duration,
    client: reqwest::Client,
}

impl EndpointSelector {
    pub fn new(endpoints: &Endpoints) -> Self {
        Self {
            networks: endpoints.networks.clone(),
            probe_timeout: Duration::from_millis(endpoints.probe_timeout_ms),
            client: reqwest::Client::builder()
                .build()
                .expect("Failed to build reqwest client"),
        }
    }

    /// Selects the healthiest endpoint for `network`.
    ///
    /// All candidates are probed concurrently; individual probe failures are
    /// tolerated and simply contribute no candidate.
    pub async fn select(&self, network: &str) -> Result<EndpointCandidate, AuthorizerError> {
        let urls = self
            .networks
            .get(network)
            .filter(|urls| !urls.is_empty())
            .ok_or_else(|| AuthorizerError::NoConfiguredEndpoint(network.to_string()))?;

        let probes = urls.iter().map(|url| self.probe(url));
        let results = futures::future::join_all(probes).await;

        let mut candidates = Vec::new();
        for result in results {
            match result {
                Ok(candidate) => candidates.push(candidate),
                Err(err) => tracing::warn!(%network, "{err}"),
            }
        }

        pick_best(candidates).ok_or_else(|| AuthorizerError::NoHealthyEndpoint(network.to_string()))
    }

    /// Fetches the latest block height from one endpoint, measuring the
    /// round-trip time and bounding the whole exchange by the probe timeout.
    async fn probe(&self, url: &str) -> Result<EndpointCandidate, AuthorizerError> {
        let started = Instant::now();
        let request = self.client.post(url).json(&json!({
            "jsonrpc": "2.0",
            "method": "eth_getBlockByNumber",
            "params": ["latest", false],
            "id": 1,
        }));

        let response = tokio::time::timeout(self.probe_timeout, async {
            request
                .send()
                .await?
                .error_for_status()?
                .json::<BlockNumberResponse>()
                .await
        })
        .await
        .map_err(|_| AuthorizerError::ProbeFailed {
            url: url.to_string(),
            reason: format!("timed out after {:?}", self.probe_timeout),
        })?
        .map_err(|e| AuthorizerError::ProbeFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let latency = started.elapsed();
        let raw = response
            .result
            .map(|head| head.number)
            .ok_or_else(|| AuthorizerError::InvalidHeight {
                url: url.to_string(),
                raw: "null".to_string(),
            })?;
        let height = parse_hex_height(&raw).ok_or_else(|| AuthorizerError::InvalidHeight {
            url: url.to_string(),
            raw,
        })?;

        tracing::debug!(%url, height, ?latency, "endpoint probe succeeded");
        Ok(EndpointCandidate {
            url: url.to_string(),
            latency,
            height,
        })
    }
}

fn parse_hex_height(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw.strip_prefix("0x").unwrap_or(raw), 16).ok()
}

/// The pure selection policy: keep only candidates at the maximum observed
/// height, then take the lowest latency among them.
pub fn pick_best(candidates: Vec<EndpointCandidate>) -> Option<EndpointCandidate> {
    let max_height = candidates.iter().map(|c| c.height).max()?;
    candidates
        .into_iter()
        .filter(|c| c.height == max_height)
        .min_by_key(|c| c.latency)
}
