use crate::fingerprint::Fingerprint;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Which numeric field of an archive record was being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Count,
    Size,
    Offset,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Count => write!(f, "count"),
            Field::Size => write!(f, "size"),
            Field::Offset => write!(f, "offset"),
        }
    }
}

/// Ways an archive record can fail to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedKind {
    #[error("{field} field is not a decimal integer: {line:?}")]
    InvalidNumber { field: Field, line: String },

    #[error("{field} field exceeds the maximum length")]
    FieldTooLong { field: Field },

    #[error("{field} field is not terminated by a newline")]
    UnterminatedField { field: Field },

    #[error("chunk data truncated: expected {expected} bytes, found {actual}")]
    TruncatedData { expected: u64, actual: u64 },

    #[error("expected {expected} offsets, found {found}")]
    MissingOffsets { expected: u64, found: u64 },

    #[error("offset {offset} plus size {size} overflows")]
    OffsetOverflow { offset: u64, size: u64 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed archive record {record}: {kind}")]
    ArchiveMalformed { record: u64, kind: MalformedKind },

    #[error(
        "fingerprint collision on {fingerprint}: block at offset {offset} differs from block at offset {first_offset}"
    )]
    FingerprintCollision {
        fingerprint: Fingerprint,
        first_offset: u64,
        offset: u64,
    },

    #[error("chunk size must be at least 1, got {0}")]
    InvalidChunkSize(usize),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
