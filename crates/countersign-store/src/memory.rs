use std::collections::HashMap;
use std::sync::RwLock;

use countersign_canonical::UserId;

use crate::error::StoreError;
use crate::keys::{KeyRecord, KeyStore, PublicKeyBytes, SealedKeyMaterial};

/// In-process key store.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    records: RwLock<HashMap<UserId, KeyRecord>>,
}

impl MemoryKeyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with keys.
    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    /// `true` when no user has keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyStore for MemoryKeyStore {
    fn insert(&self, record: KeyRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        if records.contains_key(&record.user_id) {
            return Err(StoreError::Exists(record.user_id));
        }
        records.insert(record.user_id.clone(), record);
        Ok(())
    }

    fn public_key(&self, user_id: &UserId) -> Result<Option<PublicKeyBytes>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        records
            .get(user_id)
            .map(KeyRecord::public_key_bytes)
            .transpose()
    }

    fn sealed_private_key(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SealedKeyMaterial>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(user_id).map(KeyRecord::sealed_material))
    }

    fn remove(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        Ok(records.remove(user_id).is_some())
    }
}
