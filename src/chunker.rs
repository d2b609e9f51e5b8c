use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// A contiguous byte range of the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub offset: u64,
    pub data: Vec<u8>,
}

impl Block {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// How a file of `total_size` bytes splits into fixed-size blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub total_size: u64,
    pub chunk_size: u64,
}

impl ChunkLayout {
    pub fn new(total_size: u64, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize(chunk_size));
        }
        Ok(ChunkLayout {
            total_size,
            chunk_size: chunk_size as u64,
        })
    }

    /// `ceil(total_size / chunk_size)`
    pub fn block_count(&self) -> u64 {
        self.total_size.div_ceil(self.chunk_size)
    }

    pub fn block_offset(&self, index: u64) -> u64 {
        index * self.chunk_size
    }

    /// Size of block `index`: the chunk size, except for a short final block.
    pub fn block_size(&self, index: u64) -> u64 {
        let remainder = self.total_size % self.chunk_size;
        if index + 1 == self.block_count() && remainder != 0 {
            remainder
        } else {
            self.chunk_size
        }
    }
}

/// Reads a source sequentially and yields its blocks in ascending offset order.
pub struct Chunker<R> {
    reader: R,
    layout: ChunkLayout,
    next: u64,
}

/// Open a regular file for reading, returning it with its length.
pub(crate) fn open_source(path: &Path) -> Result<(File, u64)> {
    let unreadable = |source| Error::SourceUnreadable {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(unreadable)?;
    let metadata = file.metadata().map_err(unreadable)?;
    if !metadata.is_file() {
        return Err(unreadable(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    Ok((file, metadata.len()))
}

impl Chunker<BufReader<File>> {
    /// Open `path` for chunking. The file size is taken once, up front.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        let (file, total_size) = open_source(path)?;
        Chunker::new(BufReader::new(file), total_size, chunk_size)
    }
}

impl<R: Read> Chunker<R> {
    /// `reader` must be positioned at the start of the data and hold at
    /// least `total_size` bytes.
    pub fn new(reader: R, total_size: u64, chunk_size: usize) -> Result<Self> {
        Ok(Chunker {
            reader,
            layout: ChunkLayout::new(total_size, chunk_size)?,
            next: 0,
        })
    }

    pub fn layout(&self) -> ChunkLayout {
        self.layout
    }

    /// Give back the underlying reader, e.g. to re-read blocks by offset.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = io::Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.layout.block_count() {
            return None;
        }

        let index = self.next;
        let mut data = vec![0u8; self.layout.block_size(index) as usize];
        if let Err(e) = self.reader.read_exact(&mut data) {
            // No further blocks once the source has failed.
            self.next = self.layout.block_count();
            return Some(Err(e));
        }

        self.next += 1;
        Some(Ok(Block {
            offset: self.layout.block_offset(index),
            data,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.layout.block_count() - self.next) as usize;
        (left, Some(left))
    }
}
