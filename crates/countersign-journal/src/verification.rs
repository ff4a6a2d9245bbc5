//! Hash chain verification.

use serde::Serialize;

use crate::errors::JournalError;
use crate::reader::AuditJournalReader;

/// Why the chain is broken at a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainBreak {
    /// The stored digest does not match the record contents.
    DigestMismatch,
    /// `prev` does not name the preceding record's digest.
    BrokenLink,
    /// Sequence numbers are not consecutive from 0.
    SequenceGap {
        /// Sequence number that should have followed.
        expected: u64,
        /// Sequence number found instead.
        found: u64,
    },
}

/// Result of walking a journal's hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// Records checked, up to and including the first broken one.
    pub records: u64,
    /// Sequence number of the first broken record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_broken: Option<u64>,
    /// What is wrong with it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ChainBreak>,
}

impl ChainReport {
    /// `true` when every record checked out.
    pub fn is_intact(&self) -> bool {
        self.first_broken.is_none()
    }
}

/// Recomputes every digest and link, stopping at the first break.
pub fn verify_chain(reader: &mut AuditJournalReader) -> Result<ChainReport, JournalError> {
    let mut records = 0u64;
    let mut prev = None;

    while let Some(record) = reader.read_record()? {
        records += 1;
        let expected_seq = records - 1;
        let reason = if record.seq != expected_seq {
            Some(ChainBreak::SequenceGap {
                expected: expected_seq,
                found: record.seq,
            })
        } else if record.prev != prev {
            Some(ChainBreak::BrokenLink)
        } else if !record.digest_matches()? {
            Some(ChainBreak::DigestMismatch)
        } else {
            None
        };

        if let Some(reason) = reason {
            tracing::warn!(seq = record.seq, ?reason, "audit chain broken");
            return Ok(ChainReport {
                records,
                first_broken: Some(record.seq),
                reason: Some(reason),
            });
        }
        prev = Some(record.digest);
    }

    Ok(ChainReport {
        records,
        first_broken: None,
        reason: None,
    })
}
