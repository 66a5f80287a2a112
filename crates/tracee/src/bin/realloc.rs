//! Grows a block from 1 KiB to 512 KiB by doubling reallocations, frees it,
//! does that twice, and exits 0.

use clap::Parser;
use tracee::cli::{self, FaultArgs, ReportArgs};
use tracee_core::prelude::*;
use tracee_core::realloc::{DEFAULT_INITIAL_SIZE, DEFAULT_MAX_SIZE, DEFAULT_ROUNDS};

/// Grow blocks with realloc and free them.
#[derive(Parser, Debug)]
#[command(name = "realloc")]
#[command(version)]
#[command(about = "Grow blocks with realloc and free them", long_about = None)]
struct Cli
{
    /// Grow-and-free rounds
    #[arg(long, default_value_t = DEFAULT_ROUNDS)]
    rounds: u64,
    /// First request of each round, in bytes
    #[arg(long, default_value_t = DEFAULT_INITIAL_SIZE)]
    initial_size: usize,
    /// Size each round grows to, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
    max_size: usize,
    #[command(flatten)]
    fault: FaultArgs,
    #[command(flatten)]
    report: ReportArgs,
}

fn main()
{
    let _guard = cli::setup_logging("realloc");
    let cli = Cli::parse();

    let config = ReallocConfig {
        rounds: cli.rounds,
        initial_size: cli.initial_size,
        max_size: cli.max_size,
    };
    let allocator = CountingAllocator::new(SystemAllocator);

    let result = run_realloc(&config, &allocator);
    cli::report(cli.report, &allocator.snapshot());
    cli::or_terminate(result, cli.fault.on_fault);
}
