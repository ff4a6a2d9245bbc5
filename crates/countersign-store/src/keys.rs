//! Key storage trait and record types.

use std::sync::Arc;

use countersign_canonical::UserId;
use countersign_core::{Algorithm, PublicJwk, SealedPrivateKey};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Public key JWK as JSON bytes, ready for `countersign_core::import_public`.
pub type PublicKeyBytes = Vec<u8>;

/// Everything persisted for one user at provisioning time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Owner.
    pub user_id: UserId,
    /// Signature algorithm.
    pub algorithm: Algorithm,
    /// Public key, stored in plaintext.
    pub public_key: PublicJwk,
    /// Private key, sealed under the user's secret.
    pub sealed_private_key: SealedPrivateKey,
    /// Argon2id PHC string for the user's secret.
    pub secret_verifier: String,
    /// Provisioning time, epoch milliseconds.
    pub created_at_ms: i64,
}

impl KeyRecord {
    /// Serializes the public key.
    pub fn public_key_bytes(&self) -> Result<PublicKeyBytes, StoreError> {
        serde_json::to_vec(&self.public_key).map_err(|err| StoreError::Serialization(err.to_string()))
    }

    /// The parts needed to unlock the private key.
    pub fn sealed_material(&self) -> SealedKeyMaterial {
        SealedKeyMaterial {
            sealed: self.sealed_private_key.clone(),
            secret_verifier: self.secret_verifier.clone(),
        }
    }
}

/// Sealed private key plus the verifier checked before opening it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedKeyMaterial {
    /// Encrypted private key.
    pub sealed: SealedPrivateKey,
    /// Argon2id PHC string.
    pub secret_verifier: String,
}

/// Per-user key storage.
///
/// Records are write-once: [`KeyStore::insert`] refuses to replace an
/// existing record, and the only other mutation is [`KeyStore::remove`].
pub trait KeyStore: Send + Sync {
    /// Stores a new record. Fails with [`StoreError::Exists`] if the user
    /// already has one.
    fn insert(&self, record: KeyRecord) -> Result<(), StoreError>;

    /// The user's public key, if provisioned.
    fn public_key(&self, user_id: &UserId) -> Result<Option<PublicKeyBytes>, StoreError>;

    /// The user's sealed private key, if provisioned.
    fn sealed_private_key(&self, user_id: &UserId)
        -> Result<Option<SealedKeyMaterial>, StoreError>;

    /// Destroys the user's keys. Returns whether anything was removed.
    fn remove(&self, user_id: &UserId) -> Result<bool, StoreError>;
}

impl<T: KeyStore + ?Sized> KeyStore for &T {
    fn insert(&self, record: KeyRecord) -> Result<(), StoreError> {
        (**self).insert(record)
    }

    fn public_key(&self, user_id: &UserId) -> Result<Option<PublicKeyBytes>, StoreError> {
        (**self).public_key(user_id)
    }

    fn sealed_private_key(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SealedKeyMaterial>, StoreError> {
        (**self).sealed_private_key(user_id)
    }

    fn remove(&self, user_id: &UserId) -> Result<bool, StoreError> {
        (**self).remove(user_id)
    }
}

impl<T: KeyStore + ?Sized> KeyStore for Arc<T> {
    fn insert(&self, record: KeyRecord) -> Result<(), StoreError> {
        (**self).insert(record)
    }

    fn public_key(&self, user_id: &UserId) -> Result<Option<PublicKeyBytes>, StoreError> {
        (**self).public_key(user_id)
    }

    fn sealed_private_key(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SealedKeyMaterial>, StoreError> {
        (**self).sealed_private_key(user_id)
    }

    fn remove(&self, user_id: &UserId) -> Result<bool, StoreError> {
        (**self).remove(user_id)
    }
}
