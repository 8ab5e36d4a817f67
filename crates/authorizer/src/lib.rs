//! # Custodia Authorizer Crate
//!
//! This crate produces the authorization a rollover batch must carry before
//! the execution engine will touch it. It combines three pieces:
//!
//! - `selector`: races liveness probes against a network's candidate
//!   execution endpoints and picks the freshest, fastest one.
//! - `singleflight`: a generic per-key coalescer so bursts of concurrent
//!   callers share one in-flight execution instead of stampeding.
//! - `signer`: the canonical byte encoding of `(token, amount, steps)` and
//!   the HMAC-SHA256 signature over it, plus the verification half used by
//!   the engine.
//!
//! Producing a signature and honoring one are deliberately separate
//! concerns: this crate never executes anything, preserving the trust
//! boundary between "who can propose" and "who can execute".

// Declare the modules that constitute this crate.
pub mod error;
pub mod selector;
pub mod signer;
pub mod singleflight;

// Re-export the key components to provide a clean, public-facing API.
pub use error::AuthorizerError;
pub use selector::{EndpointCandidate, EndpointSelector};
pub use signer::{Authorization, AuthorizationSigner};
pub use singleflight::SingleFlight;
