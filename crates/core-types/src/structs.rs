use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 20-byte account identity, displayed and parsed as `0x`-prefixed hex.
///
/// Tokens, strategies and users are all addressed this way; the ledger keys
/// its state on triples of these.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| CoreError::InvalidAddress(s.to_string(), e.to_string()))?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|_| {
            CoreError::InvalidAddress(s.to_string(), "expected 20 bytes".to_string())
        })?;
        Ok(Address(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

/// The 32-byte identifier of a registered controller adapter.
///
/// Operationally these are derived from human-readable labels (e.g.
/// "pancake-swap") padded with trailing zero bytes, but any 32 bytes are a
/// valid id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ControllerId([u8; 32]);

impl ControllerId {
    pub fn new(bytes: [u8; 32]) -> Self {
        ControllerId(bytes)
    }

    /// Builds an id from an ASCII label, zero-padded on the right.
    pub fn from_label(label: &str) -> Result<Self, CoreError> {
        let raw = label.as_bytes();
        if raw.len() > 32 {
            return Err(CoreError::InvalidControllerId(
                label.to_string(),
                "label longer than 32 bytes".to_string(),
            ));
        }
        let mut bytes = [0u8; 32];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(ControllerId(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show the label when the id is a padded ASCII string, the raw hex otherwise.
        let label_end = self.0.iter().position(|b| *b == 0).unwrap_or(32);
        match std::str::from_utf8(&self.0[..label_end]) {
            Ok(label) if !label.is_empty() && self.0[label_end..].iter().all(|b| *b == 0) => {
                write!(f, "ControllerId({label})")
            }
            _ => write!(f, "ControllerId({self})"),
        }
    }
}

impl FromStr for ControllerId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| CoreError::InvalidControllerId(s.to_string(), e.to_string()))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            CoreError::InvalidControllerId(s.to_string(), "expected 32 bytes".to_string())
        })?;
        Ok(ControllerId(bytes))
    }
}

impl TryFrom<String> for ControllerId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ControllerId> for String {
    fn from(value: ControllerId) -> Self {
        value.to_string()
    }
}

/// An HMAC-SHA256 authorization tag over the canonical batch encoding.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature([u8; 32]);

impl Signature {
    pub fn new(bytes: [u8; 32]) -> Self {
        Signature(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl FromStr for Signature {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| CoreError::InvalidSignature(s.to_string(), e.to_string()))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            CoreError::InvalidSignature(s.to_string(), "expected 32 bytes".to_string())
        })?;
        Ok(Signature(bytes))
    }
}

impl TryFrom<String> for Signature {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Signature> for String {
    fn from(value: Signature) -> Self {
        value.to_string()
    }
}

/// One ordered unit of a rollover batch: which controller to invoke, and the
/// adapter-specific encoded arguments to hand it. The payload is opaque to
/// the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStep {
    pub controller_id: ControllerId,
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,
}

impl CycleStep {
    pub fn new(controller_id: ControllerId, payload: Vec<u8>) -> Self {
        Self {
            controller_id,
            payload,
        }
    }
}

/// The signed unit of authorization: a token, an amount (a token quantity
/// for deposit cycles, a percentage for withdraw cycles), and an ordered
/// sequence of cycle steps.
///
/// The signature covers `(token, amount, steps)` in order; reordering any
/// step invalidates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloverBatch {
    pub token: Address,
    pub amount: Decimal,
    pub steps: Vec<CycleStep>,
    pub signature: Signature,
}
