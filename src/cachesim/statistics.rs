use std::fmt;

use serde::{Deserialize, Serialize};

use super::cache::AccessResult;

/// the counters of a whole run, they only ever grow
#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    pub hits: usize,
    pub misses: usize,
    pub evictions: usize,
}

impl Statistics {
    pub fn record(&mut self, result: &AccessResult) {
        match result {
            AccessResult::Hit => {
                self.hits += 1;
            }
            AccessResult::MissInsert => {
                self.misses += 1;
            }
            AccessResult::MissEvictInsert(_) => {
                self.misses += 1;
                self.evictions += 1;
            }
        }
    }
    pub fn accesses(&self) -> usize {
        self.hits + self.misses
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits:{} misses:{} evictions:{}",
            self.hits, self.misses, self.evictions
        )
    }
}
