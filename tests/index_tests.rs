use std::io::Cursor;
use blockdup::{
    build_index, Block, Chunker, CollisionPolicy, DedupIndex, Error, Fingerprint, Fingerprinter,
    Occurrence, OneAtATime,
};

/// Sends every block to the same fingerprint.
struct Constant;

impl Fingerprinter for Constant {
    fn fingerprint(&self, _data: &[u8]) -> Fingerprint {
        Fingerprint(42)
    }
}

fn block(offset: u64, data: &[u8]) -> Block {
    Block {
        offset,
        data: data.to_vec(),
    }
}

fn index_of(data: &[u8], chunk_size: usize) -> DedupIndex {
    let mut chunker = Chunker::new(Cursor::new(data), data.len() as u64, chunk_size).unwrap();
    build_index(&mut chunker, &OneAtATime, CollisionPolicy::Fail).unwrap()
}

#[test]
fn test_insert_groups_identical_blocks() {
    let mut index = DedupIndex::new(CollisionPolicy::Fail);
    let a = block(0, b"aaaa");
    let b = block(4, b"bbbb");
    let a2 = block(8, b"aaaa");

    index.insert(OneAtATime.fingerprint(&a.data), &a).unwrap();
    index.insert(OneAtATime.fingerprint(&b.data), &b).unwrap();
    index.insert(OneAtATime.fingerprint(&a2.data), &a2).unwrap();

    assert_eq!(index.block_count(), 3);
    assert_eq!(index.group_count(), 2);

    let group = index
        .groups()
        .find(|g| g.fingerprint() == OneAtATime.fingerprint(b"aaaa"))
        .unwrap();
    assert_eq!(
        group.occurrences(),
        &[
            Occurrence { offset: 0, size: 4 },
            Occurrence { offset: 8, size: 4 }
        ]
    );
    assert_eq!(group.size(), 4);
}

#[test]
fn test_groups_ascending_fingerprint_order() {
    let index = index_of(b"aaaaaaaaaabbbbbbbbbbaaaaaaaaaacccccccccc", 10);

    let fingerprints: Vec<Fingerprint> = index.groups().map(|g| g.fingerprint()).collect();
    assert_eq!(
        fingerprints,
        vec![
            Fingerprint(0x1bfdaa61), // c
            Fingerprint(0x68fee7e7), // a
            Fingerprint(0xb94ae96f), // b
        ]
    );

    let offsets: Vec<Vec<u64>> = index.groups().map(|g| g.offsets().collect()).collect();
    assert_eq!(offsets, vec![vec![30], vec![0, 20], vec![10]]);
}

#[test]
fn test_occurrences_keep_insertion_order() {
    let index = index_of(b"xyxyxyxy", 2);
    let group = index.groups().next().unwrap();
    assert_eq!(index.group_count(), 1);
    assert_eq!(group.offsets().collect::<Vec<_>>(), vec![0, 2, 4, 6]);
    assert_eq!(group.first(), Occurrence { offset: 0, size: 2 });
}

#[test]
fn test_empty_index() {
    let index = index_of(b"", 10);
    assert!(index.is_empty());
    assert_eq!(index.group_count(), 0);
    assert_eq!(index.groups().count(), 0);
}

#[test]
fn test_collision_fails_loudly() {
    let mut index = DedupIndex::new(CollisionPolicy::Fail);
    index.insert(Fingerprint(42), &block(0, b"one")).unwrap();
    index.insert(Fingerprint(42), &block(3, b"one")).unwrap();

    match index.insert(Fingerprint(42), &block(6, b"two")) {
        Err(Error::FingerprintCollision {
            fingerprint,
            first_offset,
            offset,
        }) => {
            assert_eq!(fingerprint, Fingerprint(42));
            assert_eq!(first_offset, 0);
            assert_eq!(offset, 6);
        }
        other => panic!("expected a collision, got {:?}", other),
    }
}

#[test]
fn test_collision_detects_different_sizes() {
    let mut index = DedupIndex::new(CollisionPolicy::Fail);
    index.insert(Fingerprint(7), &block(0, b"abcd")).unwrap();
    assert!(index.insert(Fingerprint(7), &block(4, b"ab")).is_err());
}

#[test]
fn test_collision_separate_policy() {
    let data = b"onetwoonethr";
    let mut chunker = Chunker::new(Cursor::new(&data[..]), data.len() as u64, 3).unwrap();
    let index = build_index(&mut chunker, &Constant, CollisionPolicy::Separate).unwrap();

    assert_eq!(index.block_count(), 4);
    assert_eq!(index.group_count(), 3);

    // Same fingerprint: groups follow first appearance.
    let offsets: Vec<Vec<u64>> = index.groups().map(|g| g.offsets().collect()).collect();
    assert_eq!(offsets, vec![vec![0, 6], vec![3], vec![9]]);
}

#[test]
fn test_build_index_with_constant_fingerprint_fails() {
    let data = b"onetwo";
    let mut chunker = Chunker::new(Cursor::new(&data[..]), data.len() as u64, 3).unwrap();
    let result = build_index(&mut chunker, &Constant, CollisionPolicy::Fail);
    assert!(matches!(result, Err(Error::FingerprintCollision { .. })));
}
