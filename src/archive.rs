//! Archive format: one record per distinct block content.
//!
//! ```text
//! <count>\n
//! <size>\n
//! <size raw bytes>
//! <offset_1>\n
//! ...
//! <offset_count>\n
//! ```
//!
//! Records repeat until end of stream. A `count` or `size` of zero also ends
//! the stream.

use crate::error::{Error, Field, MalformedKind, Result};
use crate::fingerprint::ContentDigest;
use crate::index::DedupIndex;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use tracing::debug;

/// Longest accepted numeric field, excluding the newline (`u64::MAX` has 20 digits).
pub const MAX_FIELD_LEN: usize = 20;

/// What a call to [`write_archive`] produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub records: u64,
    pub offsets: u64,
    /// Raw block bytes stored, one copy per record.
    pub stored_bytes: u64,
    /// Total archive length.
    pub archive_bytes: u64,
}

fn write_field<W: Write>(out: &mut W, value: u64) -> io::Result<u64> {
    let line = format!("{}\n", value);
    out.write_all(line.as_bytes())?;
    Ok(line.len() as u64)
}

/// Serialize `index` into `out`, reading each group's stored bytes back from
/// `source` at the group's first occurrence.
pub fn write_archive<R, W>(index: &DedupIndex, source: &mut R, out: &mut W) -> Result<ArchiveSummary>
where
    R: Read + Seek,
    W: Write,
{
    let mut summary = ArchiveSummary::default();

    for group in index.groups() {
        let first = group.first();
        let mut data = vec![0u8; first.size as usize];
        source.seek(SeekFrom::Start(first.offset))?;
        source.read_exact(&mut data)?;

        if ContentDigest::of(&data) != *group.digest() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("source changed at offset {} since it was indexed", first.offset),
            )
            .into());
        }

        summary.archive_bytes += write_field(out, group.len() as u64)?;
        summary.archive_bytes += write_field(out, first.size)?;
        out.write_all(&data)?;
        summary.archive_bytes += first.size;
        for offset in group.offsets() {
            summary.archive_bytes += write_field(out, offset)?;
        }

        debug!(
            fingerprint = %group.fingerprint(),
            size = first.size,
            occurrences = group.len(),
            "wrote record"
        );

        summary.records += 1;
        summary.offsets += group.len() as u64;
        summary.stored_bytes += first.size;
    }

    Ok(summary)
}

/// One parsed archive record: a block's content and every offset it belongs at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub data: Vec<u8>,
    pub offsets: Vec<u64>,
}

impl Record {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

enum State {
    ExpectCount,
    ExpectSize { count: u64 },
    ExpectData { count: u64, size: u64 },
    ExpectOffset { count: u64, data: Vec<u8>, offsets: Vec<u64> },
}

/// Sequential record parser over an archive stream.
///
/// A record is returned only once it has been parsed completely, so callers
/// never see part of a malformed record.
pub struct ArchiveReader<R> {
    reader: R,
    record: u64,
    done: bool,
}

impl<R: BufRead> ArchiveReader<R> {
    pub fn new(reader: R) -> Self {
        ArchiveReader {
            reader,
            record: 0,
            done: false,
        }
    }

    /// Index of the record the next call will parse.
    pub fn record_index(&self) -> u64 {
        self.record
    }

    /// Parse the next record, or `None` once the stream is done.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }

        let mut state = State::ExpectCount;
        loop {
            state = match state {
                State::ExpectCount => match self.read_field(Field::Count)? {
                    None | Some(0) => return self.finish(),
                    Some(count) => State::ExpectSize { count },
                },
                State::ExpectSize { count } => match self.read_field(Field::Size)? {
                    None => return Err(self.malformed(MalformedKind::UnterminatedField { field: Field::Size })),
                    Some(0) => return self.finish(),
                    Some(size) => State::ExpectData { count, size },
                },
                State::ExpectData { count, size } => State::ExpectOffset {
                    count,
                    data: self.read_data(size)?,
                    offsets: Vec::new(),
                },
                State::ExpectOffset {
                    count,
                    data,
                    mut offsets,
                } => {
                    if offsets.len() as u64 == count {
                        self.record += 1;
                        return Ok(Some(Record { data, offsets }));
                    }

                    let offset = match self.read_field(Field::Offset)? {
                        Some(offset) => offset,
                        None => {
                            return Err(self.malformed(MalformedKind::MissingOffsets {
                                expected: count,
                                found: offsets.len() as u64,
                            }))
                        }
                    };
                    let size = data.len() as u64;
                    if offset.checked_add(size).is_none() {
                        return Err(self.malformed(MalformedKind::OffsetOverflow { offset, size }));
                    }

                    offsets.push(offset);
                    State::ExpectOffset {
                        count,
                        data,
                        offsets,
                    }
                }
            };
        }
    }

    fn finish(&mut self) -> Result<Option<Record>> {
        self.done = true;
        Ok(None)
    }

    fn malformed(&mut self, kind: MalformedKind) -> Error {
        self.done = true;
        Error::ArchiveMalformed {
            record: self.record,
            kind,
        }
    }

    /// Read one newline-terminated decimal field. `None` means the stream
    /// ended before any byte of the field.
    fn read_field(&mut self, field: Field) -> Result<Option<u64>> {
        let mut line = Vec::new();
        let read = (&mut self.reader)
            .take(MAX_FIELD_LEN as u64 + 1)
            .read_until(b'\n', &mut line)?;
        if read == 0 {
            return Ok(None);
        }

        if line.last() != Some(&b'\n') {
            let kind = if line.len() > MAX_FIELD_LEN {
                MalformedKind::FieldTooLong { field }
            } else {
                MalformedKind::UnterminatedField { field }
            };
            return Err(self.malformed(kind));
        }
        line.pop();

        let parsed = if !line.is_empty() && line.iter().all(u8::is_ascii_digit) {
            std::str::from_utf8(&line).ok().and_then(|s| s.parse::<u64>().ok())
        } else {
            None
        };
        match parsed {
            Some(value) => Ok(Some(value)),
            None => Err(self.malformed(MalformedKind::InvalidNumber {
                field,
                line: String::from_utf8_lossy(&line).into_owned(),
            })),
        }
    }

    /// Read exactly `size` raw bytes. Memory grows with what the stream
    /// actually holds, not with the declared size.
    fn read_data(&mut self, size: u64) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        (&mut self.reader).take(size).read_to_end(&mut data)?;
        if (data.len() as u64) < size {
            return Err(self.malformed(MalformedKind::TruncatedData {
                expected: size,
                actual: data.len() as u64,
            }));
        }
        Ok(data)
    }
}

impl<R: BufRead> Iterator for ArchiveReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
