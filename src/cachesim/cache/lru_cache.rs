use eyre::{Result, WrapErr};

use crate::{config::CacheGeometry, cachesim::statistics::Statistics};

use super::{decode, replacement, AccessResult};

/// a cache slot, only the identity of the block is kept, never its data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Line {
    pub(super) valid: bool,
    pub(super) tag: u64,
    pub(super) age: u64,
}

impl Line {
    pub fn is_valid(&self) -> bool {
        self.valid
    }
    pub fn tag(&self) -> u64 {
        self.tag
    }
    pub fn age(&self) -> u64 {
        self.age
    }
}

#[derive(Debug, Clone)]
struct Set {
    lines: Vec<Line>,
}

/// # LruCache
/// a set associative cache with true LRU replacement.
/// - all the sets and lines are allocated once in [`LruCache::new`]
/// - the statistics are updated by every [`LruCache::access`]
#[derive(Debug)]
pub struct LruCache {
    geometry: CacheGeometry,
    sets: Vec<Set>,
    statistics: Statistics,
}

impl LruCache {
    pub fn new(geometry: CacheGeometry) -> Result<Self> {
        let num_sets = geometry.num_sets();
        let associativity = geometry.associativity();
        let mut sets = Vec::new();
        sets.try_reserve_exact(num_sets).wrap_err_with(|| {
            format!("cannot allocate {num_sets} sets of {associativity} lines")
        })?;
        for _ in 0..num_sets {
            let mut lines = Vec::new();
            lines.try_reserve_exact(associativity).wrap_err_with(|| {
                format!("cannot allocate {num_sets} sets of {associativity} lines")
            })?;
            lines.resize(associativity, Line::default());
            sets.push(Set { lines });
        }
        tracing::debug!(num_sets, associativity, "cache allocated");
        Ok(Self {
            geometry,
            sets,
            statistics: Statistics::default(),
        })
    }

    /// access the line holding `tag` in set `set_index`
    ///
    /// # Panics
    /// panics if `set_index` is not a set of this cache, [`decode`] never produces such an index
    pub fn access(&mut self, tag: u64, set_index: usize) -> AccessResult {
        let lines = &mut self.sets[set_index].lines;
        replacement::age_valid_lines(lines);

        if let Some(line) = lines.iter_mut().find(|line| line.valid && line.tag == tag) {
            replacement::touch(line);
            self.statistics.record(&AccessResult::Hit);
            return AccessResult::Hit;
        }

        let result = match replacement::find_empty(lines) {
            Some(empty) => {
                let line = &mut lines[empty];
                line.valid = true;
                line.tag = tag;
                replacement::touch(line);
                AccessResult::MissInsert
            }
            None => {
                let victim = replacement::find_victim(lines);
                let line = &mut lines[victim];
                let evicted = line.tag;
                line.tag = tag;
                replacement::touch(line);
                AccessResult::MissEvictInsert(evicted)
            }
        };
        self.statistics.record(&result);
        result
    }

    /// decode the address and access it
    pub fn access_addr(&mut self, addr: u64) -> AccessResult {
        let (tag, set_index) = decode(addr, &self.geometry);
        let result = self.access(tag, set_index);
        tracing::trace!(addr, tag, set_index, ?result, "cache access");
        result
    }

    pub fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }
    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }
    pub fn line(&self, set_index: usize, way: usize) -> Option<&Line> {
        self.sets.get(set_index)?.lines.get(way)
    }
    /// the valid tags of a set, in way order
    pub fn resident_tags(&self, set_index: usize) -> Vec<u64> {
        self.sets
            .get(set_index)
            .map(|set| {
                set.lines
                    .iter()
                    .filter(|line| line.valid)
                    .map(|line| line.tag)
                    .collect()
            })
            .unwrap_or_default()
    }
}
