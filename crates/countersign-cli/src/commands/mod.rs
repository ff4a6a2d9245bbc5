//! Subcommand implementations.

use std::path::PathBuf;

use countersign_canonical::UserId;
use countersign_store::{
    FileKeyStore, JournalAuditSink, StoreError, TracingAuditSink, WriteOptions,
};

pub mod audit;
pub mod authorize;
pub mod canonicalize;
pub mod provision;
pub mod public_key;
pub mod sign;
pub mod verify;

/// Result type shared by all commands.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Storage locations resolved from flags and environment.
pub struct Paths {
    pub key_dir: PathBuf,
    pub audit_journal: PathBuf,
}

impl Paths {
    pub fn key_store(&self) -> Result<FileKeyStore, StoreError> {
        FileKeyStore::open(&self.key_dir)
    }

    /// Journal plus a tracing copy of every entry.
    pub fn audit_sink(&self) -> Result<(JournalAuditSink, TracingAuditSink), StoreError> {
        if let Some(parent) = self.audit_journal.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let journal = JournalAuditSink::open(&self.audit_journal, WriteOptions::default())?;
        Ok((journal, TracingAuditSink))
    }
}

pub fn parse_user(user: &str) -> CommandResult<UserId> {
    UserId::parse(user).map_err(|e| format!("Invalid user id: {}", e).into())
}
