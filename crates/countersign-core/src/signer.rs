use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use countersign_canonical::{Canonicalizer, SignablePayload};
use p256::ecdsa::signature::Signer as _;
use rsa::pkcs1v15;
use rsa::signature::SignatureEncoding;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;

use crate::errors::SignError;
use crate::keys::{PrivateJwk, PrivateKey};

/// Raw signature bytes, transported as standard base64.
///
/// ES256 signatures are 64 bytes (`r || s`), RS256 signatures are as long
/// as the modulus.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Wraps raw signature bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decodes standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        STANDARD.decode(encoded.trim()).map(Self)
    }

    /// Encodes as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Borrows the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_base64())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Signature::from_base64(&text).map_err(serde::de::Error::custom)
    }
}

/// Signs raw bytes with the key's algorithm.
pub fn sign_bytes(private: &PrivateKey, message: &[u8]) -> Result<Signature, SignError> {
    let bytes = match private {
        PrivateKey::Es256(key) => {
            let signature: p256::ecdsa::Signature = key
                .try_sign(message)
                .map_err(|err| SignError::Signing(err.to_string()))?;
            signature.to_bytes().to_vec()
        }
        PrivateKey::Rs256(key) => {
            let signer = pkcs1v15::SigningKey::<Sha256>::new(key.clone());
            signer
                .try_sign(message)
                .map_err(|err| SignError::Signing(err.to_string()))?
                .to_vec()
        }
    };
    Ok(Signature(bytes))
}

/// Signs the canonical encoding of `payload`.
pub fn sign(private: &PrivateKey, payload: &SignablePayload) -> Result<Signature, SignError> {
    let message = payload.canonical_bytes_with(&Canonicalizer::default())?;
    sign_bytes(private, &message)
}

/// Imports `private` for the duration of one signature.
pub fn sign_with_jwk(private: &PrivateJwk, payload: &SignablePayload) -> Result<Signature, SignError> {
    let key = PrivateKey::from_jwk(private)?;
    sign(&key, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate, Algorithm};

    #[test]
    fn es256_signatures_are_p1363_sized() {
        let pair = generate(Algorithm::Es256).unwrap();
        let payload = SignablePayload::new().with_timestamp(1);
        let signature = sign_with_jwk(&pair.private, &payload).unwrap();
        assert_eq!(signature.as_bytes().len(), 64);
    }

    #[test]
    fn base64_round_trip_and_serde() {
        let signature = Signature::from_bytes(vec![0xFB, 0xFF, 0x00]);
        assert_eq!(signature.to_base64(), "+/8A");
        assert_eq!(Signature::from_base64("+/8A").unwrap(), signature);
        assert!(Signature::from_base64("***").is_err());

        let json = serde_json::to_string(&signature).unwrap();
        assert_eq!(json, r#""+/8A""#);
        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signature);
    }
}
