//! # Sequential Fixture
//!
//! One thread, one allocate/release pair per iteration, one `step` line per
//! iteration, one pause between iterations. The loop never ends on its own;
//! an observer stops it with a signal.
//!
//! ## Wire contract
//!
//! Each iteration writes exactly `step\n` to the output and flushes it before
//! pausing, so an observer reading the pipe sees one line per completed
//! allocate/release pair.

use std::io::Write;
use std::time::Duration;

use crate::alloc::BlockAllocator;
use crate::error::{TraceeError, TraceeResult};
use crate::shutdown::Shutdown;

/// Line written after every iteration
pub const STEP_LINE: &str = "step";

/// Bytes requested per iteration (1 MiB)
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Pause between iterations
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Settings for [`run_sequential`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialConfig
{
    /// Bytes requested per iteration
    pub block_size: usize,
    /// Pause after each `step` line
    pub interval: Duration,
    /// Stop after this many iterations; `None` runs until shutdown
    pub iterations: Option<u64>,
}

impl Default for SequentialConfig
{
    fn default() -> Self
    {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            interval: DEFAULT_INTERVAL,
            iterations: None,
        }
    }
}

impl SequentialConfig
{
    /// Reject settings the loop cannot run with.
    ///
    /// ## Errors
    ///
    /// [`TraceeError::InvalidArgument`] for a zero block size or an iteration
    /// limit of zero.
    pub fn validate(&self) -> TraceeResult<()>
    {
        if self.block_size == 0 {
            return Err(TraceeError::InvalidArgument("block size must be non-zero".to_string()));
        }
        if self.iterations == Some(0) {
            return Err(TraceeError::InvalidArgument("iteration limit must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause
{
    /// A shutdown was requested
    Shutdown,
    /// The configured iteration count was reached
    IterationLimit,
}

/// Result of a finished [`run_sequential`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialSummary
{
    /// Iterations whose `step` line was written and flushed
    pub iterations: u64,
    /// What ended the loop
    pub stopped_by: StopCause,
}

/// Run the allocate/release/report loop.
///
/// ## Errors
///
/// - Allocation faults from `allocator`
/// - [`TraceeError::Io`] when `out` cannot be written or flushed
pub fn run_sequential<A, W>(
    config: &SequentialConfig,
    allocator: &A,
    out: &mut W,
    shutdown: &Shutdown,
) -> TraceeResult<SequentialSummary>
where
    A: BlockAllocator + ?Sized,
    W: Write + ?Sized,
{
    config.validate()?;
    tracing::info!(
        block_size = config.block_size,
        interval_ms = u64::try_from(config.interval.as_millis()).unwrap_or(u64::MAX),
        iterations = ?config.iterations,
        "sequential fixture started"
    );

    let mut completed = 0u64;
    let stopped_by = loop {
        if shutdown.is_requested() {
            break StopCause::Shutdown;
        }
        if config.iterations.is_some_and(|limit| completed >= limit) {
            break StopCause::IterationLimit;
        }

        step(allocator, config.block_size, out)?;
        completed += 1;
        tracing::debug!(iteration = completed, "step written");

        if config.iterations.is_some_and(|limit| completed >= limit) {
            break StopCause::IterationLimit;
        }
        if shutdown.wait_timeout(config.interval) {
            break StopCause::Shutdown;
        }
    };

    tracing::info!(iterations = completed, stopped_by = ?stopped_by, "sequential fixture stopped");
    Ok(SequentialSummary {
        iterations: completed,
        stopped_by,
    })
}

/// One iteration. Kept out of line so it shows up as its own stack frame.
#[inline(never)]
fn step<A, W>(allocator: &A, block_size: usize, out: &mut W) -> TraceeResult<()>
where
    A: BlockAllocator + ?Sized,
    W: Write + ?Sized,
{
    let block = allocator.allocate(block_size)?;
    allocator.release(block);

    writeln!(out, "{STEP_LINE}")?;
    out.flush()?;
    Ok(())
}
