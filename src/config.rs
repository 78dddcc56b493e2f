use eyre::{ensure, Result, WrapErr};
use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

/// the width of a simulated address in bits
pub const ADDRESS_WIDTH: u32 = u64::BITS;

/// the raw cache parameters, as given on the command line or in a toml file
///
/// nothing here is checked yet, call [`CacheConfig::validate`] to get a [`CacheGeometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// number of set index bits (the number of sets is 2^s)
    #[serde(alias = "s")]
    pub set_index_bits: u32,
    /// number of block bits (the block size is 2^b)
    #[serde(alias = "b")]
    pub block_bits: u32,
    /// number of lines per set
    #[serde(alias = "E")]
    pub associativity: usize,
}

impl CacheConfig {
    pub fn new(set_index_bits: u32, block_bits: u32, associativity: usize) -> Self {
        Self {
            set_index_bits,
            block_bits,
            associativity,
        }
    }

    pub fn from_config_file(config_file: impl AsRef<Path>) -> Result<CacheConfig> {
        let config_file = config_file.as_ref();
        let content = fs::read_to_string(config_file)
            .wrap_err_with(|| format!("cannot read config file {}", config_file.display()))?;
        let config: CacheConfig =
            toml::from_str(&content).wrap_err("cannot deserialize to CacheConfig")?;
        Ok(config)
    }

    /// check the parameters and build the geometry used by the cache
    pub fn validate(&self) -> Result<CacheGeometry> {
        let Self {
            set_index_bits,
            block_bits,
            associativity,
        } = *self;
        ensure!(
            associativity >= 1,
            "associativity must be at least 1, got {}",
            associativity
        );
        ensure!(
            set_index_bits
                .checked_add(block_bits)
                .map_or(false, |bits| bits <= ADDRESS_WIDTH),
            "set index bits ({}) + block bits ({}) exceed the {}-bit address width",
            set_index_bits,
            block_bits,
            ADDRESS_WIDTH
        );
        ensure!(
            set_index_bits < usize::BITS,
            "set index bits ({}) give more sets than this machine can address",
            set_index_bits
        );
        let num_sets = 1usize << set_index_bits;
        ensure!(
            num_sets.checked_mul(associativity).is_some(),
            "{} sets of {} lines overflow the line count",
            num_sets,
            associativity
        );
        Ok(CacheGeometry {
            set_index_bits,
            block_bits,
            associativity,
        })
    }
}

/// a validated cache geometry, immutable for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheGeometry {
    set_index_bits: u32,
    block_bits: u32,
    associativity: usize,
}

impl CacheGeometry {
    pub fn set_index_bits(&self) -> u32 {
        self.set_index_bits
    }
    pub fn block_bits(&self) -> u32 {
        self.block_bits
    }
    pub fn associativity(&self) -> usize {
        self.associativity
    }
    pub fn num_sets(&self) -> usize {
        1 << self.set_index_bits
    }
    /// block size in bytes, `None` when 2^b does not fit in a u64
    pub fn block_size(&self) -> Option<u64> {
        1u64.checked_shl(self.block_bits)
    }
    pub fn tag_bits(&self) -> u32 {
        ADDRESS_WIDTH - self.set_index_bits - self.block_bits
    }
}
