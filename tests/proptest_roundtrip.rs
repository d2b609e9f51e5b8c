//! Property tests over the whole dedup/redup pipeline.

use std::io::Cursor;
use blockdup::{
    build_index, reconstruct, write_archive, ArchiveReader, ChunkLayout, Chunker, CollisionPolicy,
    OneAtATime,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn dedup_in_memory(data: &[u8], chunk_size: usize) -> Vec<u8> {
    let mut chunker = Chunker::new(Cursor::new(data), data.len() as u64, chunk_size).unwrap();
    let index = build_index(&mut chunker, &OneAtATime, CollisionPolicy::Fail).unwrap();
    let mut archive = Vec::new();
    write_archive(&index, &mut Cursor::new(data), &mut archive).unwrap();
    archive
}

fn redup_in_memory(archive: &[u8]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    reconstruct(archive, &mut out).unwrap();
    out.into_inner()
}

/// Data drawn from a small alphabet so that repeated blocks are common.
fn repetitive_data() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(prop_oneof![Just(b'a'), Just(b'b'), any::<u8>()], 0..768)
}

proptest! {
    #[test]
    fn prop_roundtrip(data in repetitive_data(), chunk_size in 1usize..64) {
        let archive = dedup_in_memory(&data, chunk_size);
        prop_assert_eq!(redup_in_memory(&archive), data);
    }

    #[test]
    fn prop_block_count(len in 0u64..100_000, chunk_size in 1usize..4096) {
        let layout = ChunkLayout::new(len, chunk_size).unwrap();
        let c = chunk_size as u64;
        prop_assert_eq!(layout.block_count(), (len + c - 1) / c);
        if len > 0 {
            let last = layout.block_size(layout.block_count() - 1);
            let expected = if len % c == 0 { c } else { len % c };
            prop_assert_eq!(last, expected);
        }
    }

    #[test]
    fn prop_archive_is_reproducible(data in repetitive_data(), chunk_size in 1usize..32) {
        prop_assert_eq!(dedup_in_memory(&data, chunk_size), dedup_in_memory(&data, chunk_size));
    }

    #[test]
    fn prop_each_content_stored_once(data in repetitive_data(), chunk_size in 1usize..16) {
        let archive = dedup_in_memory(&data, chunk_size);
        let records: Vec<_> = ArchiveReader::new(&archive[..]).map(Result::unwrap).collect();

        let mut contents: Vec<&[u8]> = records.iter().map(|r| r.data.as_slice()).collect();
        let before = contents.len();
        contents.sort();
        contents.dedup();
        prop_assert_eq!(contents.len(), before);

        let total: usize = records.iter().map(|r| r.offsets.len()).sum();
        prop_assert_eq!(total as u64, ChunkLayout::new(data.len() as u64, chunk_size).unwrap().block_count());
    }
}

#[test]
fn test_roundtrip_large_random_file() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let pattern: Vec<u8> = (0..4096).map(|_| rng.gen()).collect();

    // Repeat a random pattern with some noise to get both shared and unique blocks.
    let mut data = Vec::new();
    for round in 0..32 {
        data.extend_from_slice(&pattern);
        if round % 3 == 0 {
            data.extend((0..rng.gen_range(1..500)).map(|_| rng.gen::<u8>()));
        }
    }

    for chunk_size in [1, 10, 512, 4096, 100_000] {
        let archive = dedup_in_memory(&data, chunk_size);
        assert_eq!(redup_in_memory(&archive), data, "chunk size {}", chunk_size);
    }
}

#[test]
fn test_repeated_blocks_stored_once() {
    let data = b"0123456789".repeat(50);
    let archive = dedup_in_memory(&data, 10);
    let records: Vec<_> = ArchiveReader::new(&archive[..]).map(Result::unwrap).collect();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data, b"0123456789");
    assert_eq!(records[0].offsets, (0..50).map(|i| i * 10).collect::<Vec<u64>>());
}
