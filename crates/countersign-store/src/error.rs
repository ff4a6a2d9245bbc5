//! Error types for store operations.

use countersign_canonical::UserId;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Audit journal error.
    #[error("journal error: {0}")]
    Journal(#[from] countersign_journal::JournalError),
    /// Keys already exist for this user; sealed records are never replaced.
    #[error("keys already exist for user {0}")]
    Exists(UserId),
    /// A stored record could not be parsed.
    #[error("corrupt record for user {user_id}: {reason}")]
    Corrupt {
        /// Owner of the record.
        user_id: UserId,
        /// Parse failure.
        reason: String,
    },
    /// A record could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
    /// A lock was poisoned by a panicking thread.
    #[error("store lock poisoned")]
    Poisoned,
}
