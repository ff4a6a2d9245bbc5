use countersign_canonical::CanonicalizationError;
use thiserror::Error;

/// Errors that can occur while reading or writing an audit journal.
#[derive(Error, Debug)]
pub enum JournalError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid file header (magic, version, flags or reserved bytes).
    #[error("invalid journal header: {0}")]
    InvalidHeader(String),
    /// Invalid frame header.
    #[error("invalid frame at offset {offset}: {reason}")]
    InvalidFrame {
        /// Byte offset where the frame starts.
        offset: u64,
        /// Reason for invalidity.
        reason: String,
    },
    /// Record payload exceeds the frame size limit.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size.
        size: usize,
        /// Maximum allowed size.
        max: u32,
    },
    /// A record frame does not contain valid UTF-8 JSON.
    #[error("invalid record at offset {offset}: {reason}")]
    InvalidRecord {
        /// Byte offset of the frame.
        offset: u64,
        /// Parse failure.
        reason: String,
    },
    /// The file exists but is too short to hold a header.
    #[error("file is not an audit journal ({0} bytes, shorter than the header)")]
    NotAJournal(u64),
    /// Truncated frame detected in strict mode.
    #[error("truncated frame at offset {offset}")]
    TruncatedFrame {
        /// Byte offset where the incomplete frame starts.
        offset: u64,
    },
    /// A record could not be serialized or digested.
    #[error("record encoding failed: {0}")]
    Encoding(#[from] CanonicalizationError),
}
