//! Cryptographic core of Countersign.
//!
//! Covers the key lifecycle (generation, JWK interchange, sealing under a
//! user secret), signing and verification of canonical payloads, and the
//! replay window applied to payload timestamps. Everything here is
//! synchronous and free of I/O; storage lives in `countersign-store`.
#![deny(missing_docs)]

/// Audit entries and action names.
pub mod audit;
/// Error types.
pub mod errors;
/// Key generation and JWK import/export.
pub mod keys;
/// Replay window and clocks.
pub mod replay;
/// Private key encryption at rest.
pub mod sealing;
/// Zeroizing buffers.
pub mod sensitive;
/// Payload signing.
pub mod signer;
/// Signature verification.
pub mod verifier;

pub use audit::{actions, AuditEntry};
pub use errors::{KeyError, ReplayError, SealError, SignError, VerifyError};
pub use keys::{
    export_public, generate, import_public, Algorithm, KeyPair, PrivateJwk, PrivateKey, PublicJwk,
    PublicKey,
};
pub use replay::{check_freshness, Clock, ManualClock, ReplayWindow, SystemClock};
pub use sealing::{
    decrypt, derive_key, encrypt, hash_secret, open, seal, verify_secret, KdfParams,
    SealedPrivateKey, SealingKey,
};
pub use signer::{sign, sign_bytes, sign_with_jwk, Signature};
pub use verifier::{verify, verify_bytes, verify_with_jwk};
