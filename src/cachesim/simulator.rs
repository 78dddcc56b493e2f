use std::{fmt, fs::File, path::Path};

use eyre::{Result, WrapErr};
use serde::Serialize;

use crate::{
    config::CacheGeometry,
    trace::{AccessKind, TraceRecord},
};

use super::{cache::LruCache, statistics::Statistics, AccessResult};

/// what one trace record did to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// instruction fetches do not touch the data cache
    Ignored,
    Single(AccessResult),
    /// a modify is a load then a store to the same block
    Double(AccessResult, AccessResult),
}

fn write_result(f: &mut fmt::Formatter<'_>, result: &AccessResult) -> fmt::Result {
    match result {
        AccessResult::Hit => write!(f, "hit"),
        AccessResult::MissInsert => write!(f, "miss"),
        AccessResult::MissEvictInsert(_) => write!(f, "miss eviction"),
    }
}

/// the outcome words of the verbose mode, e.g. `miss eviction hit`
impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordOutcome::Ignored => Ok(()),
            RecordOutcome::Single(result) => write_result(f, result),
            RecordOutcome::Double(first, second) => {
                write_result(f, first)?;
                write!(f, " ")?;
                write_result(f, second)
            }
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    geometry: &'a CacheGeometry,
    statistics: &'a Statistics,
}

/// # Simulator
/// one simulation session: the cache and its counters.
/// records are fed one by one, each record is finished before the next one starts.
#[derive(Debug)]
pub struct Simulator {
    cache: LruCache,
}

impl Simulator {
    pub fn new(geometry: CacheGeometry) -> Result<Self> {
        tracing::info!(
            s = geometry.set_index_bits(),
            b = geometry.block_bits(),
            E = geometry.associativity(),
            "new simulator"
        );
        Ok(Self {
            cache: LruCache::new(geometry)?,
        })
    }

    /// one data access to `addr`
    pub fn access(&mut self, addr: u64) -> AccessResult {
        self.cache.access_addr(addr)
    }

    pub fn simulate(&mut self, record: &TraceRecord) -> RecordOutcome {
        match record.kind {
            AccessKind::Instruction => RecordOutcome::Ignored,
            AccessKind::Load | AccessKind::Store => RecordOutcome::Single(self.access(record.addr)),
            AccessKind::Modify => {
                let first = self.access(record.addr);
                let second = self.access(record.addr);
                RecordOutcome::Double(first, second)
            }
        }
    }

    /// run a whole trace, stop at the first error of the source
    pub fn run<I>(&mut self, records: I) -> Result<&Statistics>
    where
        I: IntoIterator<Item = Result<TraceRecord>>,
    {
        self.run_with(records, |_, _| {})
    }

    /// like [`Simulator::run`], `on_record` sees every record and its outcome
    pub fn run_with<I, F>(&mut self, records: I, mut on_record: F) -> Result<&Statistics>
    where
        I: IntoIterator<Item = Result<TraceRecord>>,
        F: FnMut(&TraceRecord, &RecordOutcome),
    {
        let mut total_records = 0usize;
        for record in records {
            let record = record?;
            let outcome = self.simulate(&record);
            on_record(&record, &outcome);
            total_records += 1;
        }
        tracing::info!(total_records, statistics = %self.statistics(), "simulation done");
        Ok(self.statistics())
    }

    pub fn statistics(&self) -> &Statistics {
        self.cache.statistics()
    }
    pub fn cache(&self) -> &LruCache {
        &self.cache
    }
    pub fn geometry(&self) -> &CacheGeometry {
        self.cache.geometry()
    }

    /// save the geometry and the statistics as pretty json
    pub fn save_statistics(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .wrap_err_with(|| format!("cannot create statistics file {}", path.display()))?;
        let report = Report {
            geometry: self.geometry(),
            statistics: self.statistics(),
        };
        serde_json::to_writer_pretty(file, &report).wrap_err("cannot write statistics")?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;
    use crate::{config::CacheConfig, test_utils, trace::TraceReader};

    fn new_simulator(s: u32, b: u32, e: usize) -> Simulator {
        Simulator::new(CacheConfig::new(s, b, e).validate().unwrap()).unwrap()
    }

    fn run_trace(sim: &mut Simulator, trace: &str) -> Statistics {
        *sim.run(TraceReader::new(Cursor::new(trace))).unwrap()
    }

    fn counters(stat: &Statistics) -> (usize, usize, usize) {
        (stat.hits, stat.misses, stat.evictions)
    }

    #[test]
    fn test_scenario_single_line() {
        test_utils::init();
        let mut sim = new_simulator(0, 0, 1);
        let stat = run_trace(&mut sim, " L 0,1\n L 1,1\n");
        assert_eq!(counters(&stat), (0, 2, 1));
    }

    #[test]
    fn test_scenario_two_sets() {
        let mut sim = new_simulator(1, 0, 1);
        let stat = run_trace(&mut sim, " L 0,1\n L 1,1\n L 0,1\n");
        assert_eq!(counters(&stat), (1, 2, 0));
    }

    #[test]
    fn test_scenario_two_ways() {
        let mut sim = new_simulator(0, 0, 2);
        let outcomes: Vec<_> = ["L 0,1", "L 16,1", "L 32,1"]
            .iter()
            .map(|line| sim.simulate(&line.parse().unwrap()))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                RecordOutcome::Single(AccessResult::MissInsert),
                RecordOutcome::Single(AccessResult::MissInsert),
                // address 0 is the least recently used one
                RecordOutcome::Single(AccessResult::MissEvictInsert(0)),
            ]
        );
        assert_eq!(counters(sim.statistics()), (0, 3, 1));
        assert_eq!(sim.cache().resident_tags(0), vec![0x32, 0x16]);
    }

    #[test]
    fn test_instruction_is_ignored() {
        let mut sim = new_simulator(2, 2, 2);
        let record = TraceRecord::new(AccessKind::Instruction, 0x400, 4);
        assert_eq!(sim.simulate(&record), RecordOutcome::Ignored);
        assert_eq!(sim.statistics(), &Statistics::default());
        assert_eq!(sim.cache().resident_tags(0), Vec::<u64>::new());
    }

    #[test]
    fn test_repeated_load() {
        let mut sim = new_simulator(4, 4, 1);
        let load = TraceRecord::new(AccessKind::Load, 0x7ff0005c8, 8);
        assert!(sim.simulate(&load).to_string() == "miss");
        let before = *sim.statistics();
        assert_eq!(sim.simulate(&load), RecordOutcome::Single(AccessResult::Hit));
        let after = *sim.statistics();
        assert_eq!(after.hits, before.hits + 1);
        assert_eq!(after.misses, before.misses);
        assert_eq!(after.evictions, before.evictions);
    }

    #[test]
    fn test_modify_is_two_accesses() {
        let mut sim = new_simulator(0, 4, 1);
        let modify = TraceRecord::new(AccessKind::Modify, 0x20, 1);
        assert_eq!(
            sim.simulate(&modify),
            RecordOutcome::Double(AccessResult::MissInsert, AccessResult::Hit)
        );
        assert_eq!(counters(sim.statistics()), (1, 1, 0));

        let modify = TraceRecord::new(AccessKind::Modify, 0x40, 1);
        let outcome = sim.simulate(&modify);
        assert_eq!(
            outcome,
            RecordOutcome::Double(AccessResult::MissEvictInsert(0x2), AccessResult::Hit)
        );
        assert_eq!(outcome.to_string(), "miss eviction hit");
        assert_eq!(counters(sim.statistics()), (2, 2, 1));

        // already resident: two hits
        assert_eq!(
            sim.simulate(&modify),
            RecordOutcome::Double(AccessResult::Hit, AccessResult::Hit)
        );
    }

    #[test]
    fn test_store_behaves_like_load() {
        let mut sim = new_simulator(1, 1, 1);
        let store = TraceRecord::new(AccessKind::Store, 0x6, 4);
        let load = TraceRecord::new(AccessKind::Load, 0x7, 4);
        assert_eq!(sim.simulate(&store), RecordOutcome::Single(AccessResult::MissInsert));
        assert_eq!(sim.simulate(&load), RecordOutcome::Single(AccessResult::Hit));
    }

    #[test]
    fn test_malformed_lines_do_not_count() {
        let mut sim = new_simulator(0, 0, 1);
        let stat = run_trace(&mut sim, " L 0,1\nbroken\n X 1,1\n L zz,1\n\n L 0,1\n");
        assert_eq!(counters(&stat), (1, 1, 0));
    }

    #[test]
    fn test_non_utf8_line_does_not_stop_run() {
        let mut sim = new_simulator(0, 0, 1);
        let trace: &[u8] = b" L 0,1\n\xff\xfe garbage\n L 0,1\n";
        let stat = *sim.run(TraceReader::new(Cursor::new(trace))).unwrap();
        assert_eq!(counters(&stat), (1, 1, 0));
    }

    #[test]
    fn test_size_field_never_drops_access() {
        let mut sim = new_simulator(0, 0, 1);
        let stat = run_trace(&mut sim, " L 0,1\n L 0,4294967296\n L 0,-1\n");
        assert_eq!(counters(&stat), (2, 1, 0));
    }

    #[test]
    fn test_counters_match_outcomes() {
        let trace = "I 0400d7d4,8\n M 0421c7f0,4\n L 04f6b868,8\n S 7ff0005c8,8\n M 0421c7f0,4\n L 04f6b868,8\n S 7ff0005d0,8\n";
        let mut sim = new_simulator(1, 4, 2);
        let mut expected = Statistics::default();
        let mut lines = Vec::new();
        let stat = *sim
            .run_with(TraceReader::new(Cursor::new(trace)), |record, outcome| {
                match outcome {
                    RecordOutcome::Ignored => {}
                    RecordOutcome::Single(result) => expected.record(result),
                    RecordOutcome::Double(first, second) => {
                        expected.record(first);
                        expected.record(second);
                    }
                }
                lines.push(format!("{record} {outcome}"));
            })
            .unwrap();
        assert_eq!(stat, expected);
        assert_eq!(lines[0], "I 400d7d4,8 ");
        assert_eq!(lines[1], "M 421c7f0,4 miss hit");
        assert_eq!(lines[4], "M 421c7f0,4 hit hit");
    }

    #[test]
    fn test_run_stops_at_error() {
        let mut sim = new_simulator(0, 0, 1);
        let records = vec![
            Ok(TraceRecord::new(AccessKind::Load, 0, 1)),
            Err(eyre::eyre!("cannot read trace")),
            Ok(TraceRecord::new(AccessKind::Load, 1, 1)),
        ];
        assert!(sim.run(records).is_err());
        assert_eq!(counters(sim.statistics()), (0, 1, 0));
    }

    #[test]
    fn test_save_statistics() {
        let mut sim = new_simulator(0, 0, 1);
        run_trace(&mut sim, " L 0,1\n L 0,1\n");
        let file = tempfile::NamedTempFile::new().unwrap();
        sim.save_statistics(file.path()).unwrap();
        let json: serde_json::Value =
            serde_json::from_reader(File::open(file.path()).unwrap()).unwrap();
        assert_eq!(json["statistics"]["hits"], 1);
        assert_eq!(json["statistics"]["misses"], 1);
        assert_eq!(json["geometry"]["associativity"], 1);
    }
}
