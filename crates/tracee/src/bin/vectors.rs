//! Builds and drops 1024 zero-filled 1 MiB vectors, then exits 0.

use clap::Parser;
use tracee::cli::{self, FaultArgs};
use tracee_core::prelude::*;
use tracee_core::vectors::{DEFAULT_BLOCK_SIZE, DEFAULT_ITERATIONS};

/// Allocate vectors through the global allocator.
#[derive(Parser, Debug)]
#[command(name = "vectors")]
#[command(version)]
#[command(about = "Allocate vectors through the global allocator", long_about = None)]
struct Cli
{
    /// Vectors to build and drop
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: u64,
    /// Length of each vector in bytes
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,
    #[command(flatten)]
    fault: FaultArgs,
}

fn main()
{
    let _guard = cli::setup_logging("vectors");
    let cli = Cli::parse();

    let config = VectorsConfig {
        iterations: cli.iterations,
        block_size: cli.block_size,
    };
    cli::or_terminate(run_vectors(&config), cli.fault.on_fault);
}
