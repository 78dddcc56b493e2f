use enum_as_inner::EnumAsInner;

use crate::config::CacheGeometry;

mod lru_cache;
mod replacement;

pub use lru_cache::{Line, LruCache};

/// the outcome of a single cache access
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumAsInner)]
pub enum AccessResult {
    /// the tag was resident
    Hit,
    /// the tag was installed into an empty line
    MissInsert,
    /// the set was full, the contained tag was evicted to make room
    MissEvictInsert(u64),
}

impl AccessResult {
    pub fn is_miss(&self) -> bool {
        !self.is_hit()
    }
    pub fn is_eviction(&self) -> bool {
        matches!(self, AccessResult::MissEvictInsert(_))
    }
}

/// mask with the low `bits` bits set, works for the whole 0..=64 range
pub(self) fn low_mask(bits: u32) -> u64 {
    match bits {
        0 => 0,
        b if b >= u64::BITS => u64::MAX,
        b => (1 << b) - 1,
    }
}

/// return the tag and the index of the set
///
/// - the low `b` bits are the block offset and are dropped
/// - the next `s` bits select the set
/// - everything above is the tag
pub fn decode(addr: u64, geometry: &CacheGeometry) -> (u64, usize) {
    let block_bits = geometry.block_bits();
    let set_bits = geometry.set_index_bits();
    let set_index = addr.checked_shr(block_bits).unwrap_or(0) & low_mask(set_bits);
    let tag = addr.checked_shr(block_bits + set_bits).unwrap_or(0);
    // set_index < 2^s and s < usize::BITS for a validated geometry
    (tag, set_index as usize)
}
