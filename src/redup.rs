use crate::archive::ArchiveReader;
use crate::chunker::open_source;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info};

/// Outcome of a reconstruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedupStats {
    pub records: u64,
    pub occurrences: u64,
    pub bytes_written: u64,
    /// One past the highest byte written.
    pub output_size: u64,
}

/// Rewrite every record of `archive` into `out` at each of its offsets.
///
/// On a malformed record nothing of that record is written; records before
/// it stay in `out`.
pub fn reconstruct<R, W>(archive: R, out: &mut W) -> Result<RedupStats>
where
    R: BufRead,
    W: Write + Seek,
{
    let mut stats = RedupStats::default();

    for record in ArchiveReader::new(archive) {
        let record = record?;
        for &offset in &record.offsets {
            out.seek(SeekFrom::Start(offset))?;
            out.write_all(&record.data)?;
            stats.output_size = stats.output_size.max(offset + record.size());
        }

        debug!(
            record = stats.records,
            size = record.size(),
            occurrences = record.offsets.len(),
            "restored record"
        );
        stats.records += 1;
        stats.occurrences += record.offsets.len() as u64;
        stats.bytes_written += record.size() * record.offsets.len() as u64;
    }

    Ok(stats)
}

/// Rebuild the original file at `output` from the archive at `archive`.
///
/// `output` is only created or truncated once the archive has been opened
/// and its first bytes read. If the archive turns out malformed, the bytes
/// of the records already restored are still flushed to `output`.
pub fn reduplicate(archive: &Path, output: &Path) -> Result<RedupStats> {
    let (input, _) = open_source(archive)?;
    let mut input = BufReader::new(input);
    input.fill_buf().map_err(|source| Error::SourceUnreadable {
        path: archive.to_path_buf(),
        source,
    })?;

    let file = File::create(output).map_err(|source| Error::DestinationUnwritable {
        path: output.to_path_buf(),
        source,
    })?;

    let mut out = BufWriter::new(file);
    let result = reconstruct(input, &mut out);
    let flushed = out.flush();
    let stats = result?;
    flushed?;

    info!(
        archive = %archive.display(),
        output = %output.display(),
        records = stats.records,
        bytes = stats.output_size,
        "reconstructed"
    );
    Ok(stats)
}
