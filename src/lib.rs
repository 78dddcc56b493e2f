//! # csim
//! a set associative cache simulator with LRU replacement.
//! - [`config`]: the cache parameters and their validation
//! - [`trace`]: the memory trace reader
//! - [`cachesim`]: the cache itself and the simulation session
pub mod config;
pub mod cachesim;
pub(self) mod test_utils;
pub mod trace;

pub use config::{CacheConfig, CacheGeometry};
pub use cachesim::{AccessResult, RecordOutcome, Simulator, Statistics};
pub use trace::{AccessKind, TraceReader, TraceRecord};

use tracing_subscriber::EnvFilter;

/// install the global tracing subscriber, it's fine to call it more than once.
/// the level comes from `RUST_LOG`, the default is `warn`
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .unwrap_or_default();
}
