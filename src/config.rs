use crate::error::{Error, Result};

/// Block size used when none is given.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// What to do when two blocks with different content share a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Abort the dedup pass with `Error::FingerprintCollision`.
    #[default]
    Fail,
    /// Keep the contents in separate groups, told apart by content digest.
    Separate,
}

/// Parameters of a dedup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupConfig {
    pub chunk_size: usize,
    pub collision_policy: CollisionPolicy,
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl DedupConfig {
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize(chunk_size));
        }
        Ok(DedupConfig {
            chunk_size,
            ..Default::default()
        })
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }
}
