//! Encryption of private keys at rest under a user secret.
//!
//! A 256-bit key is derived from the secret with Argon2id and a random
//! per-record salt, then the private JWK is encrypted with AES-256-GCM using
//! a fresh 16-byte IV. The KDF parameters travel with the record so that
//! raising the defaults never strands existing keys.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::errors::SealError;
use crate::keys::{Algorithm, PrivateJwk};
use crate::sensitive::SensitiveBytes32;

/// Current sealed record format.
pub const SEALED_KEY_VERSION: u32 = 1;
/// AES-GCM IV length used by sealed records.
pub const IV_LEN: usize = 16;
/// Salt length for Argon2id derivation.
pub const SALT_LEN: usize = 16;

type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Key derivation parameters stored alongside each sealed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KdfParams {
    /// Argon2id (version 0x13).
    Argon2id {
        /// Memory cost in KiB.
        memory_kib: u32,
        /// Number of passes.
        iterations: u32,
        /// Degree of parallelism.
        parallelism: u32,
    },
    /// One unsalted SHA-256 of the secret. Only for reading old records.
    LegacySha256,
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams::Argon2id {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests. Never use for real keys.
    pub fn insecure_for_tests() -> Self {
        KdfParams::Argon2id {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>, SealError> {
        let (memory_kib, iterations, parallelism) = match *self {
            KdfParams::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } => (memory_kib, iterations, parallelism),
            KdfParams::LegacySha256 => {
                return Err(SealError::KeyDerivation(
                    "legacy parameters have no Argon2 configuration".into(),
                ))
            }
        };
        let params = Params::new(memory_kib, iterations, parallelism, Some(32))
            .map_err(|err| SealError::KeyDerivation(err.to_string()))?;
        Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// A derived symmetric key together with the salt and parameters that
/// produced it.
#[derive(Debug, Clone)]
pub struct SealingKey {
    key: SensitiveBytes32,
    salt: Vec<u8>,
    kdf: KdfParams,
}

impl SealingKey {
    /// Salt used for derivation (empty for legacy keys).
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Derivation parameters.
    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }
}

/// An encrypted private key as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPrivateKey {
    /// Record format version.
    pub version: u32,
    /// Algorithm of the sealed key.
    pub algorithm: Algorithm,
    /// How the encryption key was derived.
    pub kdf: KdfParams,
    /// KDF salt.
    #[serde(with = "b64")]
    pub salt: Vec<u8>,
    /// AES-GCM IV, 16 bytes.
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
    /// Ciphertext followed by the 16-byte tag.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

/// Generates a random KDF salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derives the record encryption key. Deterministic in all three inputs.
pub fn derive_key(secret: &[u8], salt: &[u8], params: &KdfParams) -> Result<SealingKey, SealError> {
    let mut output = [0u8; 32];
    match params {
        KdfParams::Argon2id { .. } => {
            params
                .argon2()?
                .hash_password_into(secret, salt, &mut output)
                .map_err(|err| SealError::KeyDerivation(err.to_string()))?;
        }
        KdfParams::LegacySha256 => {
            output.copy_from_slice(&Sha256::digest(secret));
        }
    }
    Ok(SealingKey {
        key: SensitiveBytes32::new(output),
        salt: salt.to_vec(),
        kdf: *params,
    })
}

fn associated_data(version: u32, algorithm: Algorithm) -> Vec<u8> {
    format!("countersign:sealed-key:v{version}:{algorithm}").into_bytes()
}

/// Encrypts a private key under an already-derived key.
pub fn encrypt(private: &PrivateJwk, key: &SealingKey) -> Result<SealedPrivateKey, SealError> {
    let algorithm = private.algorithm()?;
    let plaintext = private.to_json_bytes()?;

    let cipher = Aes256Gcm16::new_from_slice(key.key.as_bytes())
        .map_err(|err| SealError::Encryption(err.to_string()))?;
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let aad = associated_data(SEALED_KEY_VERSION, algorithm);

    let ciphertext = cipher
        .encrypt(
            Nonce::<U16>::from_slice(&iv),
            Payload {
                msg: &plaintext,
                aad: &aad,
            },
        )
        .map_err(|err| SealError::Encryption(err.to_string()))?;

    Ok(SealedPrivateKey {
        version: SEALED_KEY_VERSION,
        algorithm,
        kdf: key.kdf,
        salt: key.salt.clone(),
        iv: iv.to_vec(),
        ciphertext,
    })
}

/// Decrypts a sealed record under an already-derived key.
pub fn decrypt(sealed: &SealedPrivateKey, key: &SealingKey) -> Result<PrivateJwk, SealError> {
    if sealed.version != SEALED_KEY_VERSION {
        return Err(SealError::UnsupportedVersion(sealed.version));
    }
    if sealed.iv.len() != IV_LEN {
        return Err(SealError::Malformed(format!(
            "iv must be {IV_LEN} bytes, got {}",
            sealed.iv.len()
        )));
    }

    let cipher = Aes256Gcm16::new_from_slice(key.key.as_bytes())
        .map_err(|_| SealError::Decryption)?;
    let aad = associated_data(sealed.version, sealed.algorithm);
    let plaintext = cipher
        .decrypt(
            Nonce::<U16>::from_slice(&sealed.iv),
            Payload {
                msg: &sealed.ciphertext,
                aad: &aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| SealError::Decryption)?;

    let private = PrivateJwk::from_json_bytes(&plaintext)?;
    if private.algorithm()? != sealed.algorithm {
        return Err(SealError::Malformed(
            "decrypted key does not match record algorithm".into(),
        ));
    }
    Ok(private)
}

/// Derives a key from `secret` with a fresh salt and seals `private`.
pub fn seal(
    private: &PrivateJwk,
    secret: &[u8],
    params: &KdfParams,
) -> Result<SealedPrivateKey, SealError> {
    let salt: Vec<u8> = match params {
        KdfParams::Argon2id { .. } => generate_salt().to_vec(),
        KdfParams::LegacySha256 => Vec::new(),
    };
    let key = derive_key(secret, &salt, params)?;
    encrypt(private, &key)
}

/// Re-derives the key recorded in `sealed` from `secret` and decrypts.
pub fn open(sealed: &SealedPrivateKey, secret: &[u8]) -> Result<PrivateJwk, SealError> {
    let key = derive_key(secret, &sealed.salt, &sealed.kdf)?;
    decrypt(sealed, &key)
}

/// Produces an Argon2id PHC string used to check the secret before opening.
///
/// Legacy parameters fall back to the Argon2id defaults.
pub fn hash_secret(secret: &[u8], params: &KdfParams) -> Result<String, SealError> {
    let argon2 = match params {
        KdfParams::Argon2id { .. } => params.argon2()?,
        KdfParams::LegacySha256 => KdfParams::default().argon2()?,
    };
    let salt = SaltString::encode_b64(&generate_salt())
        .map_err(|err| SealError::KeyDerivation(err.to_string()))?;
    argon2
        .hash_password(secret, &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| SealError::KeyDerivation(err.to_string()))
}

/// Checks `secret` against a PHC string from [`hash_secret`].
///
/// A mismatch is reported as [`SealError::Decryption`], the same error a
/// wrong secret produces when opening the record.
pub fn verify_secret(secret: &[u8], verifier: &str) -> Result<(), SealError> {
    let parsed = PasswordHash::new(verifier)
        .map_err(|err| SealError::Malformed(format!("secret verifier: {err}")))?;
    Argon2::default()
        .verify_password(secret, &parsed)
        .map_err(|_| SealError::Decryption)
}
