//! csim command line: replay a memory trace through the simulated cache and print
//! `hits:<h> misses:<m> evictions:<e>`.

use std::path::PathBuf;

use clap::Parser;
use eyre::{eyre, Result};

use csim::{init_tracing, CacheConfig, RecordOutcome, Simulator, TraceReader};

#[derive(Parser, Debug)]
#[command(
    name = "csim",
    version,
    about = "Set associative cache simulator with LRU replacement",
    long_about = "Replay a memory trace through a set associative cache with LRU replacement.\n\nExamples:\n  csim -s 4 -E 1 -b 4 -t traces/yi.trace\n  csim -v -s 1 -E 2 -b 4 -t traces/trans.trace\n  csim -c cache.toml -t traces/long.trace --stats-json stats.json"
)]
struct Cli {
    /// Number of set index bits (the number of sets is 2^s)
    #[arg(short = 's', value_name = "s")]
    set_index_bits: Option<u32>,

    /// Associativity (number of lines per set)
    #[arg(short = 'E', value_name = "E")]
    associativity: Option<usize>,

    /// Number of block bits (the block size is 2^b)
    #[arg(short = 'b', value_name = "b")]
    block_bits: Option<u32>,

    /// Trace file to replay
    #[arg(short = 't', value_name = "tracefile")]
    trace: PathBuf,

    /// Print every data access with its outcome
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Toml file with `s`, `b` and `E`, the flags above override it
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Also save the final statistics as json
    #[arg(long, value_name = "PATH")]
    stats_json: Option<PathBuf>,
}

/// the flag wins over the config file
fn pick<T>(flag: Option<T>, from_file: Option<T>, name: &str) -> Result<T> {
    flag.or(from_file)
        .ok_or_else(|| eyre!("missing required argument -{}", name))
}

impl Cli {
    fn cache_config(&self) -> Result<CacheConfig> {
        let base = self
            .config
            .as_ref()
            .map(|path| CacheConfig::from_config_file(path))
            .transpose()?;
        Ok(CacheConfig {
            set_index_bits: pick(self.set_index_bits, base.map(|c| c.set_index_bits), "s")?,
            block_bits: pick(self.block_bits, base.map(|c| c.block_bits), "b")?,
            associativity: pick(self.associativity, base.map(|c| c.associativity), "E")?,
        })
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let geometry = cli.cache_config()?.validate()?;
    // a missing trace is fatal before anything is simulated
    let mut reader = TraceReader::open(&cli.trace)?;
    let mut simulator = Simulator::new(geometry)?;

    let verbose = cli.verbose;
    let statistics = *simulator.run_with(reader.by_ref(), |record, outcome| {
        if verbose && *outcome != RecordOutcome::Ignored {
            println!("{record} {outcome}");
        }
    })?;
    tracing::info!(skipped = reader.skipped(), "trace lines skipped");

    if let Some(path) = &cli.stats_json {
        simulator.save_statistics(path)?;
    }
    println!("{statistics}");
    Ok(())
}
