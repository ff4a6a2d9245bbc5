//! On-disk layout.
//!
//! ```text
//! header  : "CSA1" | version u16 LE | flags u16 LE | 8 reserved zero bytes
//! frame*  : kind u8 | 3 reserved zero bytes | len u32 LE | len bytes of JSON
//! ```

use crate::errors::JournalError;

/// Journal file magic bytes.
pub const MAGIC: &[u8; 4] = b"CSA1";

/// Current format version.
pub const VERSION: u16 = 1;

/// File header size in bytes.
pub const HEADER_SIZE: usize = 16;

/// Frame header size in bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest accepted record payload: 1 MiB.
pub const MAX_PAYLOAD_SIZE: u32 = 1024 * 1024;

/// Frame kind byte of an audit record.
pub const FRAME_KIND_AUDIT_RECORD: u8 = 0x01;

/// Encodes the file header.
pub fn encode_header() -> [u8; HEADER_SIZE] {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes[0..4].copy_from_slice(MAGIC);
    bytes[4..6].copy_from_slice(&VERSION.to_le_bytes());
    bytes
}

/// Validates a file header.
pub fn check_header(bytes: &[u8; HEADER_SIZE]) -> Result<(), JournalError> {
    if &bytes[0..4] != MAGIC {
        return Err(JournalError::InvalidHeader(format!(
            "bad magic {:?}",
            &bytes[0..4]
        )));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(JournalError::InvalidHeader(format!(
            "unsupported version {version}"
        )));
    }
    let flags = u16::from_le_bytes([bytes[6], bytes[7]]);
    if flags != 0 {
        return Err(JournalError::InvalidHeader(format!(
            "non-zero flags 0x{flags:04x}"
        )));
    }
    if bytes[8..].iter().any(|b| *b != 0) {
        return Err(JournalError::InvalidHeader("non-zero reserved bytes".into()));
    }
    Ok(())
}

/// Kind of a record frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// JSON-encoded [`AuditRecord`](crate::AuditRecord).
    AuditRecord,
    /// A kind this version does not understand; readers skip it.
    Unknown(u8),
}

impl From<u8> for FrameKind {
    fn from(byte: u8) -> Self {
        match byte {
            FRAME_KIND_AUDIT_RECORD => FrameKind::AuditRecord,
            other => FrameKind::Unknown(other),
        }
    }
}

impl From<FrameKind> for u8 {
    fn from(kind: FrameKind) -> Self {
        match kind {
            FrameKind::AuditRecord => FRAME_KIND_AUDIT_RECORD,
            FrameKind::Unknown(byte) => byte,
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame kind.
    pub kind: FrameKind,
    /// Payload length.
    pub len: u32,
}

impl FrameHeader {
    /// Builds a header for a payload of `len` bytes.
    pub fn new(kind: FrameKind, len: usize) -> Result<Self, JournalError> {
        match u32::try_from(len) {
            Ok(len) if len <= MAX_PAYLOAD_SIZE => Ok(Self { kind, len }),
            _ => Err(JournalError::PayloadTooLarge {
                size: len,
                max: MAX_PAYLOAD_SIZE,
            }),
        }
    }

    /// Encodes the header.
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut bytes = [0u8; FRAME_HEADER_SIZE];
        bytes[0] = self.kind.into();
        bytes[4..8].copy_from_slice(&self.len.to_le_bytes());
        bytes
    }

    /// Decodes a header read at `offset`.
    pub fn decode(bytes: &[u8; FRAME_HEADER_SIZE], offset: u64) -> Result<Self, JournalError> {
        if bytes[1..4] != [0, 0, 0] {
            return Err(JournalError::InvalidFrame {
                offset,
                reason: "non-zero reserved bytes".into(),
            });
        }
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if len > MAX_PAYLOAD_SIZE {
            return Err(JournalError::InvalidFrame {
                offset,
                reason: format!("payload size {len} exceeds maximum {MAX_PAYLOAD_SIZE}"),
            });
        }
        Ok(Self {
            kind: FrameKind::from(bytes[0]),
            len,
        })
    }
}
