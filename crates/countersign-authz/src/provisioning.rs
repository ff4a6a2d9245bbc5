//! Key pair provisioning and revocation.

use countersign_canonical::{KeyId, UserId};
use countersign_core::{
    actions, export_public, generate, hash_secret, seal, Algorithm, AuditEntry, Clock, KdfParams,
    PublicJwk, PublicKey, SealedPrivateKey,
};
use countersign_store::{AuditSink, KeyRecord, KeyStore};

use crate::errors::ProvisionError;
use crate::record_audit;

/// What a newly provisioned user receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedKeys {
    /// Public JWK as JSON bytes.
    pub public_key_bytes: Vec<u8>,
    /// RFC 7638 thumbprint of the public key.
    pub key_id: KeyId,
    /// Private key sealed under the user's secret.
    pub sealed_private_key: SealedPrivateKey,
    /// Argon2id PHC string for the secret.
    pub secret_verifier: String,
}

/// Generates key pairs and seals them under a user secret.
///
/// Nothing is written; see [`Provisioner`] for the storing variant.
pub fn provision_keys(
    secret: &[u8],
    algorithm: Algorithm,
    kdf: &KdfParams,
) -> Result<ProvisionedKeys, ProvisionError> {
    if secret.is_empty() {
        return Err(ProvisionError::EmptySecret);
    }
    let pair = generate(algorithm)?;
    let public_key_bytes = export_public(&pair)?;
    let key_id = PublicKey::from_jwk(&pair.public)?.thumbprint()?;
    let sealed_private_key = seal(&pair.private, secret, kdf)?;
    let secret_verifier = hash_secret(secret, kdf)?;
    Ok(ProvisionedKeys {
        public_key_bytes,
        key_id,
        sealed_private_key,
        secret_verifier,
    })
}

/// Provisions and revokes keys against a store, auditing each change.
pub struct Provisioner<K, A, C> {
    keys: K,
    audit: A,
    clock: C,
    algorithm: Algorithm,
    kdf: KdfParams,
}

impl<K: KeyStore, A: AuditSink, C: Clock> Provisioner<K, A, C> {
    /// Builds a provisioner that generates `algorithm` keys sealed with `kdf`.
    pub fn new(keys: K, audit: A, clock: C, algorithm: Algorithm, kdf: KdfParams) -> Self {
        Self {
            keys,
            audit,
            clock,
            algorithm,
            kdf,
        }
    }

    /// Generates, seals and stores a key pair for `user_id`.
    ///
    /// Fails with [`StoreError::Exists`](countersign_store::StoreError::Exists)
    /// when the user already has keys.
    pub fn provision(
        &self,
        user_id: &UserId,
        secret: &[u8],
    ) -> Result<ProvisionedKeys, ProvisionError> {
        let keys = provision_keys(secret, self.algorithm, &self.kdf)?;
        let public_key = PublicJwk::from_json_bytes(&keys.public_key_bytes)?;
        let now = self.clock.now_ms();
        self.keys.insert(KeyRecord {
            user_id: user_id.clone(),
            algorithm: self.algorithm,
            public_key,
            sealed_private_key: keys.sealed_private_key.clone(),
            secret_verifier: keys.secret_verifier.clone(),
            created_at_ms: now,
        })?;
        tracing::info!(%user_id, algorithm = %self.algorithm, key_id = %keys.key_id, "provisioned keys");
        record_audit(
            &self.audit,
            AuditEntry::new(
                actions::KEYS_PROVISIONED,
                format!("{} key {}", self.algorithm, keys.key_id),
                now,
            )
            .with_user(Some(user_id.clone())),
        );
        Ok(keys)
    }

    /// Deletes the user's keys. Returns false if there were none.
    pub fn revoke(&self, user_id: &UserId) -> Result<bool, ProvisionError> {
        let removed = self.keys.remove(user_id)?;
        if removed {
            tracing::info!(%user_id, "revoked keys");
            record_audit(
                &self.audit,
                AuditEntry::new(actions::KEYS_REVOKED, "keys destroyed", self.clock.now_ms())
                    .with_user(Some(user_id.clone())),
            );
        }
        Ok(removed)
    }
}
