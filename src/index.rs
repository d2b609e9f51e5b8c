use crate::chunker::Block;
use crate::config::CollisionPolicy;
use crate::error::{Error, Result};
use crate::fingerprint::{ContentDigest, Fingerprint};
use std::collections::BTreeMap;
use tracing::warn;

/// One place in the source file where a block's content appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub offset: u64,
    pub size: u64,
}

/// All occurrences of one distinct block content, in first-seen order.
#[derive(Debug, Clone)]
pub struct OccurrenceGroup {
    fingerprint: Fingerprint,
    digest: ContentDigest,
    occurrences: Vec<Occurrence>,
}

impl OccurrenceGroup {
    fn new(fingerprint: Fingerprint, digest: ContentDigest, first: Occurrence) -> Self {
        OccurrenceGroup {
            fingerprint,
            digest,
            occurrences: vec![first],
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    /// The occurrence whose bytes are stored in the archive.
    pub fn first(&self) -> Occurrence {
        // Groups are created with one occurrence and never shrink.
        self.occurrences[0]
    }

    /// Size shared by every occurrence, taken from the first.
    pub fn size(&self) -> u64 {
        self.first().size
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    pub fn offsets(&self) -> impl Iterator<Item = u64> + '_ {
        self.occurrences.iter().map(|o| o.offset)
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}

/// Fingerprint-to-occurrences index built during the dedup pass.
///
/// Iteration order is ascending fingerprint value. Under
/// [`CollisionPolicy::Separate`] several groups may share a fingerprint;
/// those are ordered by first appearance. Both orders only depend on the
/// input bytes and chunk size, so serialized archives are reproducible.
#[derive(Debug, Default)]
pub struct DedupIndex {
    groups: BTreeMap<Fingerprint, Vec<OccurrenceGroup>>,
    policy: CollisionPolicy,
    blocks: u64,
}

impl DedupIndex {
    pub fn new(policy: CollisionPolicy) -> Self {
        DedupIndex {
            groups: BTreeMap::new(),
            policy,
            blocks: 0,
        }
    }

    /// Record `block` under `fingerprint`, creating the group on first use.
    ///
    /// A block whose content differs from the group already holding this
    /// fingerprint is a collision, handled according to the policy.
    pub fn insert(&mut self, fingerprint: Fingerprint, block: &Block) -> Result<()> {
        let digest = ContentDigest::of(&block.data);
        let occurrence = Occurrence {
            offset: block.offset,
            size: block.size(),
        };

        let slot = self.groups.entry(fingerprint).or_default();
        if let Some(group) = slot.iter_mut().find(|g| g.digest == digest) {
            group.occurrences.push(occurrence);
        } else {
            if let Some(existing) = slot.first() {
                match self.policy {
                    CollisionPolicy::Fail => {
                        return Err(Error::FingerprintCollision {
                            fingerprint,
                            first_offset: existing.first().offset,
                            offset: block.offset,
                        });
                    }
                    CollisionPolicy::Separate => {
                        warn!(
                            %fingerprint,
                            first_offset = existing.first().offset,
                            offset = block.offset,
                            "fingerprint collision, keeping contents apart"
                        );
                    }
                }
            }
            slot.push(OccurrenceGroup::new(fingerprint, digest, occurrence));
        }

        self.blocks += 1;
        Ok(())
    }

    /// Groups in serialization order.
    pub fn groups(&self) -> impl Iterator<Item = &OccurrenceGroup> {
        self.groups.values().flatten()
    }

    pub fn group_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Number of blocks inserted so far.
    pub fn block_count(&self) -> u64 {
        self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks == 0
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }
}
