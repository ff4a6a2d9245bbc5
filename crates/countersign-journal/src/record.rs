use countersign_canonical::{CanonicalizationError, Canonicalizer, Digest};
use countersign_core::AuditEntry;
use serde::{Deserialize, Serialize};

/// Domain separator for record digests: `b"countersign:audit:v1\0"`.
pub const AUDIT_DOMAIN_SEPARATOR: &[u8] = b"countersign:audit:v1\0";

/// An audit entry as stored in the journal, linked to its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Position in the journal, starting at 0.
    pub seq: u64,
    /// Digest of the previous record; absent for the first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<Digest>,
    /// The audited event.
    pub entry: AuditEntry,
    /// Digest over `seq`, `prev` and `entry`.
    pub digest: Digest,
}

#[derive(Serialize)]
struct RecordBody<'a> {
    seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    prev: Option<&'a Digest>,
    entry: &'a AuditEntry,
}

/// Computes the digest a record with these fields must carry.
pub fn compute_record_digest(
    seq: u64,
    prev: Option<&Digest>,
    entry: &AuditEntry,
) -> Result<Digest, CanonicalizationError> {
    let bytes = Canonicalizer::default().encode_serialize(&RecordBody { seq, prev, entry })?;
    Ok(Digest::compute(AUDIT_DOMAIN_SEPARATOR, &[&bytes]))
}

impl AuditRecord {
    /// Builds a record and computes its digest.
    pub fn new(
        seq: u64,
        prev: Option<Digest>,
        entry: AuditEntry,
    ) -> Result<Self, CanonicalizationError> {
        let digest = compute_record_digest(seq, prev.as_ref(), &entry)?;
        Ok(Self {
            seq,
            prev,
            entry,
            digest,
        })
    }

    /// Returns `true` when the stored digest matches the contents.
    pub fn digest_matches(&self) -> Result<bool, CanonicalizationError> {
        Ok(compute_record_digest(self.seq, self.prev.as_ref(), &self.entry)? == self.digest)
    }
}
