//! Threaded fixture.
//!
//! Spawns 8 workers that each allocate and free 64 KiB 100 times, joins them
//! in creation order, and exits 0. A worker that cannot allocate ends the
//! process from its own thread.

use std::sync::Arc;

use clap::Parser;
use tracee::cli::{self, FaultArgs, ReportArgs};
use tracee_core::prelude::*;
use tracee_core::threaded::{DEFAULT_BLOCK_SIZE, DEFAULT_CYCLES, DEFAULT_WORKERS};

/// Run a pool of allocate/free workers and wait for all of them.
#[derive(Parser, Debug)]
#[command(name = "threaded")]
#[command(version)]
#[command(about = "Run a pool of allocate/free workers and wait for all of them", long_about = None)]
struct Cli
{
    /// Worker threads to spawn
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
    /// Allocate/free cycles per worker
    #[arg(long, default_value_t = DEFAULT_CYCLES)]
    cycles: u64,
    /// Bytes allocated per cycle
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,
    #[command(flatten)]
    fault: FaultArgs,
    #[command(flatten)]
    report: ReportArgs,
}

fn main()
{
    let _guard = cli::setup_logging("threaded");
    let cli = Cli::parse();
    let policy = cli.fault.on_fault;

    let config = ThreadedConfig {
        workers: cli.workers,
        cycles: cli.cycles,
        block_size: cli.block_size,
    };
    let allocator = Arc::new(CountingAllocator::new(SystemAllocator));

    let result = run_threaded_with(&config, &allocator, move |error| policy.handle(error));
    cli::report(cli.report, &allocator.snapshot());
    cli::or_terminate(result, policy);
}
