use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;

use crate::validation::ValidationError;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlg {
    /// SHA-256.
    #[serde(rename = "sha-256")]
    Sha256,
}

/// Algorithm + bytes digest, encoded as base64url without padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest {
    /// Digest algorithm (currently always `sha-256`).
    pub alg: DigestAlg,
    /// Base64URL (no padding) digest bytes.
    pub b64: String,
}

impl Digest {
    /// Constructs a validated digest.
    pub fn new(alg: DigestAlg, b64: impl Into<String>) -> Result<Self, ValidationError> {
        let b64 = b64.into();
        let re = Regex::new(r"^[A-Za-z0-9_-]{43}$").expect("invalid regex");
        if !re.is_match(&b64) {
            return Err(ValidationError::PatternMismatch {
                field: "digest",
                value: b64,
            });
        }
        Ok(Digest { alg, b64 })
    }

    /// Computes `sha256(domain || part_0 || part_1 ...)`.
    ///
    /// Each domain separator must end in a NUL byte so that no two domains
    /// can collide by prefix.
    pub fn compute(domain: &[u8], parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        for part in parts {
            hasher.update(part);
        }
        Digest {
            alg: DigestAlg::Sha256,
            b64: base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize()),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha-256:{}", self.b64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_domain_separated() {
        let a = Digest::compute(b"countersign:a\0", &[b"payload"]);
        let b = Digest::compute(b"countersign:b\0", &[b"payload"]);
        assert_ne!(a, b);
        assert_eq!(a, Digest::compute(b"countersign:a\0", &[b"pay", b"load"]));
    }

    #[test]
    fn computed_digest_passes_validation() {
        let digest = Digest::compute(b"x\0", &[b"y"]);
        assert!(Digest::new(DigestAlg::Sha256, digest.b64.clone()).is_ok());
    }

    #[test]
    fn rejects_short_or_padded_b64() {
        assert!(Digest::new(DigestAlg::Sha256, "Zm9v").is_err());
        let padded = format!("{}=", "A".repeat(43));
        assert!(Digest::new(DigestAlg::Sha256, padded).is_err());
    }
}
