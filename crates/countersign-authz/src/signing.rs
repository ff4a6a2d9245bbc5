//! Server-side signing with a sealed key.
//!
//! For clients that cannot hold a private key: the user supplies the secret
//! per request, the sealed key is opened in memory, used once and dropped.

use countersign_canonical::{SignablePayload, UserId};
use countersign_core::{
    actions, open, sign, verify_secret, AuditEntry, Clock, PrivateKey, SealError, Signature,
};
use countersign_store::{AuditSink, KeyStore};

use crate::errors::SigningError;
use crate::record_audit;

/// Signs payloads on behalf of users whose keys are sealed in the store.
pub struct SigningService<K, A, C> {
    keys: K,
    audit: A,
    clock: C,
}

impl<K: KeyStore, A: AuditSink, C: Clock> SigningService<K, A, C> {
    /// Builds a signing service.
    pub fn new(keys: K, audit: A, clock: C) -> Self {
        Self { keys, audit, clock }
    }

    /// Signs `payload` with the key of `user_id`, unlocked by `secret`.
    ///
    /// Every outcome is audited; the secret and key material never are.
    pub fn request_signature(
        &self,
        user_id: &UserId,
        payload: &SignablePayload,
        secret: &[u8],
    ) -> Result<Signature, SigningError> {
        let result = self.sign_inner(user_id, payload, secret);
        let (action, details) = match &result {
            Ok(_) => (actions::PAYLOAD_SIGNED, "payload signed".to_string()),
            Err(err) => (failure_action(err), err.to_string()),
        };
        if let Err(err) = &result {
            tracing::info!(%user_id, kind = err.kind(), "signing request refused");
        }
        record_audit(
            &self.audit,
            AuditEntry::new(action, details, self.clock.now_ms())
                .with_user(Some(user_id.clone()))
                .with_attempt_id(payload.digest().ok()),
        );
        result
    }

    fn sign_inner(
        &self,
        user_id: &UserId,
        payload: &SignablePayload,
        secret: &[u8],
    ) -> Result<Signature, SigningError> {
        if secret.is_empty() {
            return Err(SigningError::InvalidData("secret is required".into()));
        }
        payload
            .timestamp_ms()
            .map_err(|err| SigningError::InvalidData(err.to_string()))?;

        let material = self
            .keys
            .sealed_private_key(user_id)?
            .ok_or(SigningError::NoKey)?;
        verify_secret(secret, &material.secret_verifier).map_err(|err| match err {
            SealError::Decryption => SigningError::Decryption,
            other => SigningError::MalformedKey(other.to_string()),
        })?;
        let jwk = open(&material.sealed, secret)?;
        let private =
            PrivateKey::from_jwk(&jwk).map_err(|err| SigningError::MalformedKey(err.to_string()))?;
        Ok(sign(&private, payload)?)
    }
}

fn failure_action(err: &SigningError) -> &'static str {
    match err {
        SigningError::InvalidData(_) => actions::SIGN_REQUEST_INVALID_DATA,
        SigningError::NoKey => actions::SIGN_REQUEST_NO_PRIVATE_KEY,
        SigningError::Decryption => actions::SIGN_REQUEST_INVALID_PASSWORD,
        SigningError::MalformedKey(_) => actions::SIGN_REQUEST_MALFORMED_KEY,
        SigningError::Signing(_) | SigningError::Store(_) => actions::SIGN_REQUEST_ERROR,
    }
}
