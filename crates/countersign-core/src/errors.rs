use countersign_canonical::{CanonicalizationError, PayloadError};
use thiserror::Error;

/// Errors raised while generating, importing or exporting keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The key material is not a valid JWK for its declared type.
    #[error("malformed key: {0}")]
    Malformed(String),
    /// The algorithm tag is not one this crate implements.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// The random generator or the key generator failed.
    #[error("key generation failed: {0}")]
    Generation(String),
    /// The JWK could not be serialized.
    #[error("key serialization failed: {0}")]
    Serialization(String),
}

/// Errors raised while sealing or opening a private key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SealError {
    /// Wrong secret or corrupted record. Deliberately does not say which.
    #[error("private key could not be decrypted")]
    Decryption,
    /// The key derivation function rejected its parameters.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
    /// AES-GCM encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),
    /// The sealed record was written by an unknown format version.
    #[error("unsupported sealed key version {0}")]
    UnsupportedVersion(u32),
    /// The sealed record or secret verifier is structurally invalid.
    #[error("malformed sealed record: {0}")]
    Malformed(String),
    /// The decrypted key could not be parsed.
    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Errors raised while signing a payload.
#[derive(Error, Debug)]
pub enum SignError {
    /// The payload could not be canonicalized.
    #[error("payload encoding failed: {0}")]
    Encoding(#[from] CanonicalizationError),
    /// The private key could not be used.
    #[error(transparent)]
    Key(#[from] KeyError),
    /// The signature primitive failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Structural failures of verification.
///
/// A signature that simply does not match is not an error: the verifier
/// returns `Ok(false)` for it.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The public key is not usable.
    #[error("malformed public key: {0}")]
    MalformedKey(#[from] KeyError),
    /// The payload lacks a valid `timestamp` or has the wrong shape.
    #[error("invalid payload: {0}")]
    Payload(#[from] PayloadError),
    /// The signature is not valid base64.
    #[error("signature is not valid base64: {0}")]
    SignatureEncoding(String),
    /// The payload could not be canonicalized.
    #[error("payload encoding failed: {0}")]
    Encoding(#[from] CanonicalizationError),
}

/// Freshness failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayError {
    /// The payload is older than the acceptance window.
    #[error("payload expired: {age_ms} ms old, window is {max_age_ms} ms")]
    Expired {
        /// Age of the payload at check time.
        age_ms: i64,
        /// Configured window.
        max_age_ms: u64,
    },
    /// The payload is dated further in the future than clock skew allows.
    #[error("payload is {ahead_ms} ms in the future, allowed skew is {max_skew_ms} ms")]
    FromFuture {
        /// How far ahead of the server clock the timestamp is.
        ahead_ms: i64,
        /// Configured skew allowance.
        max_skew_ms: u64,
    },
}
