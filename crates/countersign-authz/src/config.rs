//! Service configuration.
//!
//! ```toml
//! [replay]
//! max_age_ms = 5000
//! max_future_skew_ms = 1000
//!
//! [keys]
//! algorithm = "ES256"
//!
//! [kdf]
//! memory_kib = 19456
//! iterations = 2
//! parallelism = 1
//! ```
//!
//! Every field is optional and falls back to the values above.

use std::path::{Path, PathBuf};

use countersign_core::{Algorithm, KdfParams, ReplayWindow};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Key generation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeysConfig {
    /// Algorithm for newly provisioned key pairs.
    pub algorithm: Algorithm,
}

/// Argon2id settings for newly sealed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KdfConfig {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfConfig {
    /// Parameters recorded in sealed keys.
    pub fn params(&self) -> KdfParams {
        KdfParams::Argon2id {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

/// Top-level configuration of the authorization services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthzConfig {
    /// Payload freshness window.
    pub replay: ReplayWindow,
    /// Key generation.
    pub keys: KeysConfig,
    /// Key sealing.
    pub kdf: KdfConfig,
}

impl AuthzConfig {
    /// Parses and validates TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AuthzConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replay.max_age_ms == 0 {
            return Err(ConfigError::Invalid("replay.max_age_ms must be positive".into()));
        }
        let kdf = &self.kdf;
        if kdf.iterations == 0 || kdf.parallelism == 0 {
            return Err(ConfigError::Invalid(
                "kdf.iterations and kdf.parallelism must be positive".into(),
            ));
        }
        if kdf.memory_kib < 8 * kdf.parallelism {
            return Err(ConfigError::Invalid(format!(
                "kdf.memory_kib must be at least {} for parallelism {}",
                8 * kdf.parallelism,
                kdf.parallelism
            )));
        }
        Ok(())
    }
}
