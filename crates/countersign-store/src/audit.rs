//! Audit sinks and readers.

use std::path::Path;
use std::sync::{Arc, Mutex};

use countersign_core::AuditEntry;
use countersign_journal::{AuditJournalReader, AuditJournalWriter, AuditRecord, WriteOptions};

use crate::error::StoreError;

/// Tracing target used by [`TracingAuditSink`].
pub const AUDIT_TARGET: &str = "countersign::audit";

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    /// Records one entry.
    fn record(&self, entry: AuditEntry) -> Result<(), StoreError>;
}

impl<T: AuditSink + ?Sized> AuditSink for &T {
    fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        (**self).record(entry)
    }
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        (**self).record(entry)
    }
}

/// Records into both sinks. The second still runs when the first fails.
impl<A: AuditSink, B: AuditSink> AuditSink for (A, B) {
    fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        let first = self.0.record(entry.clone());
        let second = self.1.record(entry);
        first.and(second)
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Actions of the recorded entries, in order.
    pub fn actions(&self) -> Vec<String> {
        self.entries().into_iter().map(|entry| entry.action).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .push(entry);
        Ok(())
    }
}

/// Appends entries to a hash-chained journal file.
pub struct JournalAuditSink {
    writer: Mutex<AuditJournalWriter>,
}

impl JournalAuditSink {
    /// Opens (or creates) the journal at `path`.
    pub fn open<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self, StoreError> {
        Ok(Self {
            writer: Mutex::new(AuditJournalWriter::open(path, options)?),
        })
    }
}

impl AuditSink for JournalAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        let mut writer = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        writer.append(entry)?;
        Ok(())
    }
}

/// Emits entries as `tracing` events on the [`AUDIT_TARGET`] target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        tracing::info!(
            target: AUDIT_TARGET,
            action = %entry.action,
            user_id = entry.user_id.as_ref().map(|id| id.as_str()),
            client_ip = entry.client_ip.as_deref(),
            attempt_id = entry.attempt_id.as_ref().map(|d| d.b64.as_str()),
            timestamp = entry.timestamp,
            "{}",
            entry.details
        );
        Ok(())
    }
}

/// Sequential source of stored audit records.
pub trait AuditReader {
    /// Reads the next record, or `None` at the end.
    fn read_next(&mut self) -> Result<Option<AuditRecord>, StoreError>;
}

impl AuditReader for AuditJournalReader {
    fn read_next(&mut self) -> Result<Option<AuditRecord>, StoreError> {
        Ok(self.read_record()?)
    }
}
