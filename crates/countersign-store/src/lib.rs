//! Storage handles for Countersign.
//!
//! Services never reach for global state: the caller builds a [`KeyStore`]
//! and an [`AuditSink`] and passes them in. This crate provides:
//! - [`MemoryKeyStore`] and [`FileKeyStore`] for key records
//! - [`MemoryAuditSink`], [`JournalAuditSink`] and [`TracingAuditSink`]
//! - [`AuditFilter`] combinators and [`FilteredReader`] for audit queries
#![deny(missing_docs)]

/// Audit sinks and readers.
pub mod audit;
/// Error types for store operations.
pub mod error;
/// File-backed key store.
pub mod file;
/// Audit record filtering.
pub mod filter;
/// Key store trait and records.
pub mod keys;
/// In-memory key store.
pub mod memory;

pub use audit::{
    AuditReader, AuditSink, JournalAuditSink, MemoryAuditSink, TracingAuditSink, AUDIT_TARGET,
};
pub use countersign_journal::{ReadMode, WriteOptions};
pub use error::StoreError;
pub use file::FileKeyStore;
pub use filter::{
    ActionFilter, AndFilter, AuditFilter, FilteredReader, OrFilter, TimeRangeFilter, UserFilter,
};
pub use keys::{KeyRecord, KeyStore, PublicKeyBytes, SealedKeyMaterial};
pub use memory::MemoryKeyStore;
