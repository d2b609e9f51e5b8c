use std::fmt;

/// A fixed-width, non-cryptographic fingerprint of a block.
///
/// Only used in memory to group blocks; never written to the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(pub u32);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Maps a block's bytes to a fingerprint.
///
/// Implementations must be deterministic: identical bytes always yield
/// identical fingerprints.
pub trait Fingerprinter {
    fn fingerprint(&self, data: &[u8]) -> Fingerprint;
}

/// Jenkins one-at-a-time hash, seeded at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneAtATime;

impl Fingerprinter for OneAtATime {
    fn fingerprint(&self, data: &[u8]) -> Fingerprint {
        Fingerprint(one_at_a_time(data))
    }
}

/// Jenkins one-at-a-time hash over unsigned bytes.
pub fn one_at_a_time(data: &[u8]) -> u32 {
    let mut hash: u32 = 0;

    for &byte in data {
        hash = hash.wrapping_add(u32::from(byte));
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }

    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);

    hash
}

/// Strong content digest (BLAKE3) used to verify that blocks sharing a
/// fingerprint really hold the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    pub fn of(data: &[u8]) -> Self {
        ContentDigest(*blake3::hash(data).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}
