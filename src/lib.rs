pub mod archive;
pub mod chunker;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod redup;

pub use archive::{write_archive, ArchiveReader, ArchiveSummary, Record};
pub use chunker::{Block, ChunkLayout, Chunker};
pub use config::{CollisionPolicy, DedupConfig, DEFAULT_CHUNK_SIZE};
pub use dedup::{build_index, deduplicate, deduplicate_with, DedupStats};
pub use error::{Error, Field, MalformedKind, Result};
pub use fingerprint::{ContentDigest, Fingerprint, Fingerprinter, OneAtATime};
pub use index::{DedupIndex, Occurrence, OccurrenceGroup};
pub use redup::{reconstruct, reduplicate, RedupStats};
