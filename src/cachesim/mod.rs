pub(self) mod cache;
pub(self) mod simulator;
pub(self) mod statistics;

pub use cache::{decode, AccessResult, Line, LruCache};
pub use simulator::{RecordOutcome, Simulator};
pub use statistics::Statistics;
