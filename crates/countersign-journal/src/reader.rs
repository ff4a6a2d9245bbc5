//! Sequential journal reader.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::errors::JournalError;
use crate::frame::{check_header, FrameHeader, FrameKind, FRAME_HEADER_SIZE, HEADER_SIZE};
use crate::record::AuditRecord;

/// How a reader treats an incomplete final frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// A truncated frame is an error.
    Strict,
    /// A truncated frame is treated as end of file.
    Permissive,
}

/// Reads audit records from a journal file in order.
///
/// [`AuditJournalReader::position`] only moves past frames that were read
/// completely, so after a permissive read it marks the end of the intact
/// prefix of the file.
pub struct AuditJournalReader {
    file: BufReader<File>,
    mode: ReadMode,
    position: u64,
    len: u64,
}

impl AuditJournalReader {
    /// Opens a journal and validates its header.
    pub fn open<P: AsRef<Path>>(path: P, mode: ReadMode) -> Result<Self, JournalError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < HEADER_SIZE as u64 {
            return Err(JournalError::NotAJournal(len));
        }
        let mut file = BufReader::new(file);
        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)?;
        check_header(&header)?;
        Ok(Self {
            file,
            mode,
            position: HEADER_SIZE as u64,
            len,
        })
    }

    /// Offset just past the last complete frame read.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Length of the file when it was opened.
    pub fn file_len(&self) -> u64 {
        self.len
    }

    fn truncated(&self) -> Result<Option<(FrameKind, Vec<u8>)>, JournalError> {
        match self.mode {
            ReadMode::Permissive => Ok(None),
            ReadMode::Strict => Err(JournalError::TruncatedFrame {
                offset: self.position,
            }),
        }
    }

    /// Reads the next frame of any kind.
    pub fn read_frame(&mut self) -> Result<Option<(FrameKind, Vec<u8>)>, JournalError> {
        let remaining = self.len.saturating_sub(self.position);
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < FRAME_HEADER_SIZE as u64 {
            return self.truncated();
        }

        self.file.seek(SeekFrom::Start(self.position))?;
        let mut header_bytes = [0u8; FRAME_HEADER_SIZE];
        self.file.read_exact(&mut header_bytes)?;
        let header = FrameHeader::decode(&header_bytes, self.position)?;

        if remaining - (FRAME_HEADER_SIZE as u64) < u64::from(header.len) {
            return self.truncated();
        }
        let mut payload = vec![0u8; header.len as usize];
        match self.file.read_exact(&mut payload) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return self.truncated(),
            Err(err) => return Err(err.into()),
        }

        self.position += FRAME_HEADER_SIZE as u64 + u64::from(header.len);
        Ok(Some((header.kind, payload)))
    }

    /// Reads the next audit record, skipping frames of unknown kinds.
    pub fn read_record(&mut self) -> Result<Option<AuditRecord>, JournalError> {
        loop {
            let offset = self.position;
            match self.read_frame()? {
                None => return Ok(None),
                Some((FrameKind::AuditRecord, payload)) => {
                    let record = serde_json::from_slice(&payload).map_err(|err| {
                        JournalError::InvalidRecord {
                            offset,
                            reason: err.to_string(),
                        }
                    })?;
                    return Ok(Some(record));
                }
                Some((FrameKind::Unknown(kind), _)) => {
                    tracing::debug!(kind, offset, "skipping unknown journal frame");
                }
            }
        }
    }
}

impl Iterator for AuditJournalReader {
    type Item = Result<AuditRecord, JournalError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}
