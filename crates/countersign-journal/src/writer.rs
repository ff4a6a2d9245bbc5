//! Append-only journal writer.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use countersign_canonical::Digest;
use countersign_core::AuditEntry;

use crate::errors::JournalError;
use crate::frame::{encode_header, FrameHeader, FrameKind, HEADER_SIZE};
use crate::reader::{AuditJournalReader, ReadMode};
use crate::record::AuditRecord;

/// Options for opening a journal for writing.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// fsync after every append (default: false).
    pub sync: bool,
    /// Create the file when it does not exist (default: true).
    pub create: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            sync: false,
            create: true,
        }
    }
}

/// Appends hash-chained audit records to a journal file.
///
/// Opening an existing journal scans it to recover the next sequence
/// number and the digest to chain from. A torn final frame left by a crash
/// is cut off before the first new append.
pub struct AuditJournalWriter {
    file: File,
    sync: bool,
    next_seq: u64,
    last_digest: Option<Digest>,
}

impl AuditJournalWriter {
    /// Opens or creates a journal.
    pub fn open<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self, JournalError> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .create(options.create)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();
        let mut writer = Self {
            file,
            sync: options.sync,
            next_seq: 0,
            last_digest: None,
        };

        if len == 0 {
            writer.file.write_all(&encode_header())?;
            writer.flush()?;
            return Ok(writer);
        }
        if len < HEADER_SIZE as u64 {
            return Err(JournalError::NotAJournal(len));
        }

        let mut reader = AuditJournalReader::open(path, ReadMode::Permissive)?;
        while let Some(record) = reader.read_record()? {
            writer.next_seq = record.seq + 1;
            writer.last_digest = Some(record.digest);
        }
        let intact = reader.position();
        if intact < len {
            tracing::warn!(
                path = %path.display(),
                discarded_bytes = len - intact,
                "truncating torn tail of audit journal"
            );
            writer.file.set_len(intact)?;
        }
        writer.file.seek(SeekFrom::Start(intact))?;
        Ok(writer)
    }

    /// Sequence number the next record will get.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Digest of the last record written, if any.
    pub fn last_digest(&self) -> Option<&Digest> {
        self.last_digest.as_ref()
    }

    /// Chains `entry` onto the journal and returns the stored record.
    pub fn append(&mut self, entry: AuditEntry) -> Result<AuditRecord, JournalError> {
        let record = AuditRecord::new(self.next_seq, self.last_digest.clone(), entry)?;
        let payload = serde_json::to_vec(&record).map_err(|err| JournalError::InvalidRecord {
            offset: 0,
            reason: err.to_string(),
        })?;
        self.append_frame(FrameKind::AuditRecord, &payload)?;
        self.next_seq += 1;
        self.last_digest = Some(record.digest.clone());
        Ok(record)
    }

    /// Writes one raw frame. Used for record frames and by tests that need
    /// frames of other kinds.
    pub fn append_frame(&mut self, kind: FrameKind, payload: &[u8]) -> Result<(), JournalError> {
        let header = FrameHeader::new(kind, payload.len())?;
        let mut frame = Vec::with_capacity(header.encode().len() + payload.len());
        frame.extend_from_slice(&header.encode());
        frame.extend_from_slice(payload);
        self.file.write_all(&frame)?;
        self.flush()
    }

    fn flush(&mut self) -> Result<(), JournalError> {
        self.file.flush()?;
        if self.sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Flushes and closes the journal.
    pub fn finish(mut self) -> Result<(), JournalError> {
        self.flush()
    }
}

impl Drop for AuditJournalWriter {
    fn drop(&mut self) {
        let _ = self.file.flush();
    }
}
