use crate::archive::write_archive;
use crate::chunker::Chunker;
use crate::config::{CollisionPolicy, DedupConfig};
use crate::error::{Error, Result};
use crate::fingerprint::{Fingerprinter, OneAtATime};
use crate::index::DedupIndex;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

/// Outcome of a dedup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub blocks: u64,
    pub groups: u64,
    pub source_bytes: u64,
    pub stored_bytes: u64,
    pub archive_bytes: u64,
}

/// Feed every block of `chunker` into a fresh index.
pub fn build_index<R, F>(
    chunker: &mut Chunker<R>,
    fingerprinter: &F,
    policy: CollisionPolicy,
) -> Result<DedupIndex>
where
    R: Read,
    F: Fingerprinter + ?Sized,
{
    let mut index = DedupIndex::new(policy);
    for block in chunker {
        let block = block?;
        index.insert(fingerprinter.fingerprint(&block.data), &block)?;
    }
    Ok(index)
}

/// Deduplicate `input` into a new archive at `archive`.
pub fn deduplicate(input: &Path, archive: &Path, config: &DedupConfig) -> Result<DedupStats> {
    deduplicate_with(input, archive, config, &OneAtATime)
}

/// [`deduplicate`] with a caller-chosen fingerprint function.
///
/// The archive is only created once the whole source has been indexed. If
/// writing it fails, the partial archive is removed.
pub fn deduplicate_with<F>(
    input: &Path,
    archive: &Path,
    config: &DedupConfig,
    fingerprinter: &F,
) -> Result<DedupStats>
where
    F: Fingerprinter + ?Sized,
{
    let mut chunker = Chunker::open(input, config.chunk_size)?;
    let source_bytes = chunker.layout().total_size;
    let index = build_index(&mut chunker, fingerprinter, config.collision_policy).map_err(
        |e| match e {
            Error::Io(source) => Error::SourceUnreadable {
                path: input.to_path_buf(),
                source,
            },
            other => other,
        },
    )?;
    let mut reader = chunker.into_inner();

    let file = File::create(archive).map_err(|source| Error::DestinationUnwritable {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);

    let written = write_archive(&index, &mut reader, &mut out).and_then(|summary| {
        out.flush()?;
        Ok(summary)
    });
    let summary = match written {
        Ok(summary) => summary,
        Err(e) => {
            drop(out);
            let _ = fs::remove_file(archive);
            return Err(e);
        }
    };

    let stats = DedupStats {
        blocks: index.block_count(),
        groups: summary.records,
        source_bytes,
        stored_bytes: summary.stored_bytes,
        archive_bytes: summary.archive_bytes,
    };
    info!(
        input = %input.display(),
        archive = %archive.display(),
        chunk_size = config.chunk_size,
        blocks = stats.blocks,
        groups = stats.groups,
        stored_bytes = stats.stored_bytes,
        "deduplicated"
    );
    Ok(stats)
}
