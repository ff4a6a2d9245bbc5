use countersign_canonical::SignablePayload;
use p256::ecdsa::signature::Verifier as _;
use rsa::pkcs1v15;
use sha2::Sha256;

use crate::errors::VerifyError;
use crate::keys::{import_public, PublicKey};
use crate::signer::Signature;

/// Checks raw signature bytes over `message`.
///
/// Returns `false` for any cryptographic rejection, including signatures of
/// the wrong length or with out-of-range scalars.
pub fn verify_bytes(public: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
    match public {
        PublicKey::Es256(key) => match p256::ecdsa::Signature::from_slice(signature) {
            Ok(sig) => key.verify(message, &sig).is_ok(),
            Err(_) => false,
        },
        PublicKey::Rs256(key) => match pkcs1v15::Signature::try_from(signature) {
            Ok(sig) => pkcs1v15::VerifyingKey::<Sha256>::new(key.clone())
                .verify(message, &sig)
                .is_ok(),
            Err(_) => false,
        },
    }
}

/// Verifies a base64 signature over the canonical encoding of `payload`.
///
/// `Ok(false)` means the signature does not match. `Err` is reserved for
/// requests that cannot be checked at all: a payload without a numeric
/// `timestamp`, a signature that is not base64, or a payload that cannot be
/// canonicalized.
pub fn verify(
    public: &PublicKey,
    payload: &SignablePayload,
    signature_b64: &str,
) -> Result<bool, VerifyError> {
    payload.timestamp_ms()?;
    let signature = Signature::from_base64(signature_b64)
        .map_err(|err| VerifyError::SignatureEncoding(err.to_string()))?;
    let message = payload.canonical_bytes()?;
    let valid = verify_bytes(public, &message, signature.as_bytes());
    tracing::debug!(algorithm = %public.algorithm(), valid, "verified payload signature");
    Ok(valid)
}

/// Like [`verify`], importing the public key from JWK bytes first.
///
/// A key that cannot be imported is [`VerifyError::MalformedKey`].
pub fn verify_with_jwk(
    public_jwk: &[u8],
    payload: &SignablePayload,
    signature_b64: &str,
) -> Result<bool, VerifyError> {
    let public = import_public(public_jwk)?;
    verify(&public, payload, signature_b64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{export_public, generate, Algorithm, PrivateKey};
    use crate::signer::sign;

    fn signed_fixture() -> (PublicKey, SignablePayload, String) {
        let pair = generate(Algorithm::Es256).unwrap();
        let private = PrivateKey::from_jwk(&pair.private).unwrap();
        let payload = SignablePayload::new()
            .with("productId", "p1")
            .with("amount", 10)
            .with_timestamp(1_700_000_000_000);
        let signature = sign(&private, &payload).unwrap();
        (private.public_key(), payload, signature.to_base64())
    }

    #[test]
    fn wrong_length_signature_is_false_not_error() {
        let (public, payload, _) = signed_fixture();
        assert!(!verify(&public, &payload, "AAAA").unwrap());
    }

    #[test]
    fn zero_scalars_are_false_not_error() {
        let (public, payload, _) = signed_fixture();
        let zeros = Signature::from_bytes(vec![0u8; 64]).to_base64();
        assert!(!verify(&public, &payload, &zeros).unwrap());
    }

    #[test]
    fn undecodable_signature_is_error() {
        let (public, payload, _) = signed_fixture();
        assert!(matches!(
            verify(&public, &payload, "not base64 at all!"),
            Err(VerifyError::SignatureEncoding(_))
        ));
    }

    #[test]
    fn missing_timestamp_is_error() {
        let (public, _, signature) = signed_fixture();
        let payload = SignablePayload::new().with("amount", 10);
        assert!(matches!(
            verify(&public, &payload, &signature),
            Err(VerifyError::Payload(_))
        ));
    }

    #[test]
    fn malformed_key_bytes_are_error() {
        let (_, payload, signature) = signed_fixture();
        assert!(matches!(
            verify_with_jwk(br#"{"kty":"EC","crv":"P-256"}"#, &payload, &signature),
            Err(VerifyError::MalformedKey(_))
        ));
    }

    #[test]
    fn verify_with_jwk_accepts_exported_key() {
        let pair = generate(Algorithm::Es256).unwrap();
        let private = PrivateKey::from_jwk(&pair.private).unwrap();
        let payload = SignablePayload::new().with_timestamp(5);
        let signature = sign(&private, &payload).unwrap();
        let jwk = export_public(&pair).unwrap();
        assert!(verify_with_jwk(&jwk, &payload, &signature.to_base64()).unwrap());
    }
}
