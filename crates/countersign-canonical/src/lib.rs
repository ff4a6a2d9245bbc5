//! Canonical payload encoding for Countersign purchase authorization.
//!
//! Signatures are only reproducible when the signer and the verifier feed
//! byte-identical input to the signature scheme. This crate owns that input:
//! every signing and verifying path in the workspace goes through
//! [`Canonicalizer::encode`], which emits RFC 8785 canonical JSON (keys sorted
//! by UTF-16 code units at every level, no insignificant whitespace,
//! ECMAScript number formatting, strings as raw UTF-8).
//!
#![deny(missing_docs)]

/// Canonicalization of JSON values into deterministic bytes.
pub mod canonicalizer;
/// Domain-separated SHA-256 digests.
pub mod digest;
/// Identifier newtypes (user ids, key ids).
pub mod identifiers;
/// The signable payload type.
pub mod payload;
/// Validation helpers used by canonical types.
pub mod validation;

pub use canonicalizer::{CanonicalizationError, Canonicalizer, DEFAULT_MAX_DEPTH};
pub use digest::{Digest, DigestAlg};
pub use identifiers::{KeyId, UserId};
pub use payload::{PayloadError, SignablePayload, TIMESTAMP_FIELD};
pub use validation::ValidationError;
