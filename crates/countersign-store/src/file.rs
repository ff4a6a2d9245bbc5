//! Directory-backed key store: one JSON file per user.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use countersign_canonical::UserId;

use crate::error::StoreError;
use crate::keys::{KeyRecord, KeyStore, PublicKeyBytes, SealedKeyMaterial};

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Stores each user's [`KeyRecord`] as `<dir>/<user_id>.json`.
///
/// [`UserId`] only admits characters that are safe in file names and never
/// starts with a dot, so ids map to files without escaping. Records are
/// written to a dot-prefixed staging file and hard-linked into place, so a
/// failed write never leaves a partial `<user_id>.json` behind.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &UserId) -> PathBuf {
        self.dir.join(format!("{user_id}.json"))
    }

    fn staging_path_for(&self, user_id: &UserId) -> PathBuf {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{user_id}.{}.{seq}.tmp", std::process::id()))
    }

    fn load(&self, user_id: &UserId) -> Result<Option<KeyRecord>, StoreError> {
        let bytes = match fs::read(self.path_for(user_id)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let record: KeyRecord =
            serde_json::from_slice(&bytes).map_err(|err| StoreError::Corrupt {
                user_id: user_id.clone(),
                reason: err.to_string(),
            })?;
        if &record.user_id != user_id {
            return Err(StoreError::Corrupt {
                user_id: user_id.clone(),
                reason: format!("file belongs to {}", record.user_id),
            });
        }
        Ok(Some(record))
    }
}

fn write_staged(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    restrict_permissions(&mut options);
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(unix)]
fn restrict_permissions(options: &mut OpenOptions) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(0o600);
}

#[cfg(not(unix))]
fn restrict_permissions(_options: &mut OpenOptions) {}

impl KeyStore for FileKeyStore {
    fn insert(&self, record: KeyRecord) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&record)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;

        let path = self.path_for(&record.user_id);
        let staging = self.staging_path_for(&record.user_id);
        // The link refuses to replace an existing record.
        let result = write_staged(&staging, &json).and_then(|()| fs::hard_link(&staging, &path));
        if let Err(err) = fs::remove_file(&staging) {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %staging.display(), error = %err, "staging file left behind");
            }
        }
        match result {
            Ok(()) => {
                tracing::debug!(user_id = %record.user_id, path = %path.display(), "stored key record");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::Exists(record.user_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn public_key(&self, user_id: &UserId) -> Result<Option<PublicKeyBytes>, StoreError> {
        self.load(user_id)?
            .map(|record| record.public_key_bytes())
            .transpose()
    }

    fn sealed_private_key(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SealedKeyMaterial>, StoreError> {
        Ok(self.load(user_id)?.map(|record| record.sealed_material()))
    }

    fn remove(&self, user_id: &UserId) -> Result<bool, StoreError> {
        match fs::remove_file(self.path_for(user_id)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
