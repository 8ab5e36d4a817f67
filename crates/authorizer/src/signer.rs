use crate::error::AuthorizerError;
use crate::selector::{EndpointCandidate, EndpointSelector};
use crate::singleflight::SingleFlight;
use core_types::{Address, CycleStep, Signature};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

// Create a type alias for the HMAC-SHA256 implementation.
type HmacSha256 = Hmac<Sha256>;

/// The canonical byte encoding of a proposed batch.
///
/// Layout: 20 token bytes, the length-prefixed normalized decimal amount,
/// then each step in order as its raw 32-byte controller id followed by the
/// length-prefixed payload. Length prefixes keep the encoding unambiguous;
/// reordering or altering any field changes the bytes.
pub fn canonical_batch_bytes(token: &Address, amount: &Decimal, steps: &[CycleStep]) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + steps.len() * 64);
    out.extend_from_slice(token.as_bytes());

    let amount = amount.normalize().to_string();
    out.extend_from_slice(&(amount.len() as u32).to_be_bytes());
    out.extend_from_slice(amount.as_bytes());

    for step in steps {
        out.extend_from_slice(step.controller_id.as_bytes());
        out.extend_from_slice(&(step.payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&step.payload);
    }
    out
}

/// Signs the canonical encoding of a batch with the configured credential.
pub fn sign_batch(
    secret: &str,
    token: &Address,
    amount: &Decimal,
    steps: &[CycleStep],
) -> Signature {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(&canonical_batch_bytes(token, amount, steps));
    let bytes: [u8; 32] = mac.finalize().into_bytes().into();
    Signature::new(bytes)
}

/// Validates a batch signature against the configured credential.
/// The comparison is constant-time.
pub fn verify_batch(
    secret: &str,
    token: &Address,
    amount: &Decimal,
    steps: &[CycleStep],
    signature: &Signature,
) -> bool {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(&canonical_batch_bytes(token, amount, steps));
    mac.verify_slice(signature.as_bytes()).is_ok()
}

/// A granted authorization: the signature to attach to the batch and the
/// endpoint the caller should submit it through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    pub endpoint: String,
    pub signature: Signature,
}

/// Produces signed authorizations for proposed batches.
///
/// A healthy endpoint is a precondition: no authorization is issued for a
/// network with no live endpoint. Concurrent requests for the same network
/// share one probe round through the coalescer; signatures themselves are
/// derived fresh per call and never cached.
pub struct AuthorizationSigner {
    secret: String,
    selector: Arc<EndpointSelector>,
    selections: SingleFlight<EndpointCandidate, AuthorizerError>,
}

impl AuthorizationSigner {
    pub fn new(secret: String, selector: Arc<EndpointSelector>) -> Self {
        Self {
            secret,
            selector,
            selections: SingleFlight::new(),
        }
    }

    /// Authorizes `(token, amount, steps)` for execution on `network`.
    pub async fn authorize(
        &self,
        network: &str,
        token: &Address,
        amount: &Decimal,
        steps: &[CycleStep],
    ) -> Result<Authorization, AuthorizerError> {
        let endpoint = self
            .selections
            .run(network, || self.selector.select(network))
            .await
            .map_err(AuthorizerError::Coalesced)?;

        tracing::info!(%network, endpoint = %endpoint.url, "authorization granted");

        Ok(Authorization {
            endpoint: endpoint.url,
            signature: sign_batch(&self.secret, token, amount, steps),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ControllerId;
    use rust_decimal_macros::dec;

    fn token() -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = 1;
        Address::new(bytes)
    }

    fn steps() -> Vec<CycleStep> {
        vec![
            CycleStep::new(
                ControllerId::from_label("router-masterchef-USDT-BUSD").unwrap(),
                vec![0xde, 0xad],
            ),
            CycleStep::new(
                ControllerId::from_label("pancake-swap").unwrap(),
                vec![0xbe, 0xef],
            ),
        ]
    }

    #[test]
    fn signature_round_trips() {
        let steps = steps();
        let sig = sign_batch("secret", &token(), &dec!(20000), &steps);
        assert!(verify_batch("secret", &token(), &dec!(20000), &steps, &sig));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let steps = steps();
        let sig = sign_batch("secret", &token(), &dec!(20000), &steps);
        assert!(!verify_batch("other", &token(), &dec!(20000), &steps, &sig));
    }

    #[test]
    fn reordered_steps_invalidate_the_signature() {
        let steps = steps();
        let sig = sign_batch("secret", &token(), &dec!(20000), &steps);

        let mut reordered = steps.clone();
        reordered.swap(0, 1);
        assert!(!verify_batch("secret", &token(), &dec!(20000), &reordered, &sig));
    }

    #[test]
    fn amount_and_token_are_covered_by_the_signature() {
        let steps = steps();
        let sig = sign_batch("secret", &token(), &dec!(20000), &steps);

        assert!(!verify_batch("secret", &token(), &dec!(20001), &steps, &sig));
        let other_token = Address::new([7u8; 20]);
        assert!(!verify_batch("secret", &other_token, &dec!(20000), &steps, &sig));
    }

    #[test]
    fn amount_encoding_is_scale_insensitive() {
        // 25000 and 25000.00 are the same quantity and must sign identically.
        let steps = steps();
        let a = canonical_batch_bytes(&token(), &dec!(25000), &steps);
        let b = canonical_batch_bytes(&token(), &dec!(25000.00), &steps);
        assert_eq!(a, b);
    }

    #[test]
    fn payload_bytes_cannot_migrate_between_steps() {
        // Same concatenated payload bytes, split differently across steps.
        let id = ControllerId::from_label("pancake-swap").unwrap();
        let split_a = vec![
            CycleStep::new(id, vec![0x01, 0x02]),
            CycleStep::new(id, vec![0x03]),
        ];
        let split_b = vec![
            CycleStep::new(id, vec![0x01]),
            CycleStep::new(id, vec![0x02, 0x03]),
        ];
        assert_ne!(
            canonical_batch_bytes(&token(), &dec!(1), &split_a),
            canonical_batch_bytes(&token(), &dec!(1), &split_b)
        );
    }
}
