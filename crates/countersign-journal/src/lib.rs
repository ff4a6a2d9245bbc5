//! Append-only audit journal for Countersign.
//!
//! Every audit entry is wrapped in an [`AuditRecord`] that carries a sequence
//! number and the digest of its predecessor, so deleting or editing a record
//! anywhere in the file is detectable with [`verify_chain`].
//!
//! ```rust
//! use countersign_core::{actions, AuditEntry};
//! use countersign_journal::{verify_chain, AuditJournalReader, AuditJournalWriter, ReadMode, WriteOptions};
//!
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("audit.csa");
//!
//! let mut writer = AuditJournalWriter::open(&path, WriteOptions::default())?;
//! writer.append(AuditEntry::new(actions::KEYS_PROVISIONED, "ES256 key pair", 1))?;
//! writer.finish()?;
//!
//! let mut reader = AuditJournalReader::open(&path, ReadMode::Strict)?;
//! assert!(verify_chain(&mut reader)?.is_intact());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![deny(missing_docs)]

/// Error types for journal operations.
pub mod errors;
/// File and frame layout.
pub mod frame;
/// Journal reader.
pub mod reader;
/// Chained record type.
pub mod record;
/// Chain verification.
pub mod verification;
/// Journal writer.
pub mod writer;

pub use errors::JournalError;
pub use frame::FrameKind;
pub use reader::{AuditJournalReader, ReadMode};
pub use record::{compute_record_digest, AuditRecord};
pub use verification::{verify_chain, ChainBreak, ChainReport};
pub use writer::{AuditJournalWriter, WriteOptions};
