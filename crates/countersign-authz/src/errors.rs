use countersign_core::{KeyError, SealError, SignError};
use countersign_store::StoreError;
use thiserror::Error;

/// Boxed error from a ledger implementation.
pub type LedgerFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Infrastructure failures during authorization.
///
/// Refusals are not errors; they come back as
/// [`AuthorizationOutcome::Rejected`](crate::AuthorizationOutcome::Rejected).
#[derive(Error, Debug)]
pub enum AuthorizeError {
    /// The key store could not be read.
    #[error("key store failed: {0}")]
    KeyStore(#[from] StoreError),
    /// The ledger refused to commit a verified purchase.
    #[error("ledger failed: {0}")]
    Ledger(#[source] LedgerFailure),
}

/// Errors raised while provisioning or revoking keys.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The secret is empty.
    #[error("secret must not be empty")]
    EmptySecret,
    /// Key generation or export failed.
    #[error(transparent)]
    Key(#[from] KeyError),
    /// Sealing the private key failed.
    #[error(transparent)]
    Seal(#[from] SealError),
    /// The record could not be stored.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by server-side signing.
#[derive(Error, Debug)]
pub enum SigningError {
    /// The secret is empty or the payload cannot be signed.
    #[error("invalid signing request: {0}")]
    InvalidData(String),
    /// No sealed key is stored for the user.
    #[error("no private key stored for user")]
    NoKey,
    /// Wrong secret or a corrupted sealed record.
    #[error("private key could not be decrypted")]
    Decryption,
    /// The stored record or decrypted key is unusable.
    #[error("malformed private key: {0}")]
    MalformedKey(String),
    /// The signature primitive failed.
    #[error(transparent)]
    Signing(#[from] SignError),
    /// The key store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SigningError {
    /// Error name reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            SigningError::InvalidData(_) | SigningError::Signing(SignError::Encoding(_)) => {
                "EncodingError"
            }
            SigningError::NoKey => "NoKeyError",
            SigningError::Decryption => "DecryptionError",
            SigningError::MalformedKey(_) | SigningError::Signing(_) => "KeyError",
            SigningError::Store(_) => "StoreError",
        }
    }
}

impl From<SealError> for SigningError {
    fn from(err: SealError) -> Self {
        match err {
            SealError::Decryption => SigningError::Decryption,
            SealError::Key(err) => SigningError::MalformedKey(err.to_string()),
            other => SigningError::MalformedKey(other.to_string()),
        }
    }
}
