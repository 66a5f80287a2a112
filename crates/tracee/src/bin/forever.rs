//! Sequential fixture.
//!
//! Allocates and frees 1 MiB, prints `step`, flushes, sleeps a second, and
//! starts over. Runs until SIGINT/SIGTERM (exit 0) or a kill.

use std::io;
use std::time::Duration;

use clap::Parser;
use tracee::cli::{self, FaultArgs, ReportArgs};
use tracee_core::prelude::*;
use tracee_core::sequential::DEFAULT_BLOCK_SIZE;

/// Allocate and free a block, print `step`, pause, forever.
#[derive(Parser, Debug)]
#[command(name = "forever")]
#[command(version)]
#[command(about = "Allocate and free a block, print `step`, pause, forever", long_about = None)]
struct Cli
{
    /// Bytes allocated per iteration
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,
    /// Pause between iterations, in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    /// Stop after this many iterations instead of running until signalled
    #[arg(long)]
    iterations: Option<u64>,
    #[command(flatten)]
    fault: FaultArgs,
    #[command(flatten)]
    report: ReportArgs,
}

fn main()
{
    let _guard = cli::setup_logging("forever");
    let cli = Cli::parse();
    let policy = cli.fault.on_fault;

    let shutdown = cli::or_terminate(install_signal_handler(), policy);
    let config = SequentialConfig {
        block_size: cli.block_size,
        interval: Duration::from_millis(cli.interval_ms),
        iterations: cli.iterations,
    };
    let allocator = CountingAllocator::new(SystemAllocator);

    let result = run_sequential(&config, &allocator, &mut io::stdout().lock(), &shutdown);
    cli::report(cli.report, &allocator.snapshot());
    cli::or_terminate(result, policy);
}
