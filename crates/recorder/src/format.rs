//! Binary log encoding helpers
//!
//! The recorder only ever writes; [`decode`] exists so tests and ad-hoc
//! tooling can check a file's structure.

use thiserror::Error;

/// Size of an encoded timestamp.
pub const TIMESTAMP_LEN: usize = 8;

pub fn encode_timestamp(nanos: u64) -> [u8; TIMESTAMP_LEN] {
    nanos.to_le_bytes()
}

/// One terminated line and the timestamp written after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub line: Vec<u8>,
    pub timestamp: u64,
}

/// Structural view of a whole log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    /// File-open marker
    pub marker: u64,
    pub records: Vec<DecodedRecord>,
    /// Unterminated bytes at the end of the file
    pub trailing: Vec<u8>,
}

/// Errors from [`decode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer than eight bytes: no open marker
    #[error("log is shorter than the {TIMESTAMP_LEN}-byte open marker")]
    MissingMarker,
    /// A terminator is not followed by a full timestamp
    #[error("line ending at byte {offset} has no complete timestamp")]
    TruncatedTimestamp { offset: usize },
}

/// Decode a complete log image.
///
/// Line bytes never contain LF except as their final byte, so scanning for
/// LF and then skipping exactly eight timestamp bytes is unambiguous.
pub fn decode(bytes: &[u8]) -> Result<DecodedLog, DecodeError> {
    let (marker, mut rest) = split_timestamp(bytes).ok_or(DecodeError::MissingMarker)?;
    let mut records = Vec::new();

    while let Some(idx) = rest.iter().position(|&b| b == crate::LINE_TERMINATOR) {
        let (line, after) = rest.split_at(idx + 1);
        let (timestamp, next) = split_timestamp(after).ok_or(DecodeError::TruncatedTimestamp {
            offset: bytes.len() - after.len(),
        })?;
        records.push(DecodedRecord {
            line: line.to_vec(),
            timestamp,
        });
        rest = next;
    }

    Ok(DecodedLog {
        marker,
        records,
        trailing: rest.to_vec(),
    })
}

fn split_timestamp(bytes: &[u8]) -> Option<(u64, &[u8])> {
    let head = bytes.get(..TIMESTAMP_LEN)?;
    let mut buf = [0u8; TIMESTAMP_LEN];
    buf.copy_from_slice(head);
    Some((u64::from_le_bytes(buf), &bytes[TIMESTAMP_LEN..]))
}
