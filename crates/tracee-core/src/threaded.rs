//! # Threaded Fixture
//!
//! A fixed pool of workers, each doing a fixed number of allocate/release
//! cycles on its own private blocks. The main thread joins every worker in
//! creation order and only then returns.
//!
//! Workers share nothing but the allocator handle. There is no timeout on the
//! joins: a hung worker hangs the fixture.
//!
//! Resource faults are handed to a fault hook on the thread that hit them,
//! before any join. A binary passes [`crate::FaultPolicy::handle`] as the hook
//! so the process goes down from the faulting worker's stack.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::alloc::BlockAllocator;
use crate::error::{TraceeError, TraceeResult};

/// Number of worker threads
pub const DEFAULT_WORKERS: usize = 8;

/// Allocate/release cycles per worker
pub const DEFAULT_CYCLES: u64 = 100;

/// Bytes requested per cycle (64 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Settings for [`run_threaded`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadedConfig
{
    /// Worker threads to spawn
    pub workers: usize,
    /// Cycles each worker performs
    pub cycles: u64,
    /// Bytes requested per cycle
    pub block_size: usize,
}

impl Default for ThreadedConfig
{
    fn default() -> Self
    {
        Self {
            workers: DEFAULT_WORKERS,
            cycles: DEFAULT_CYCLES,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl ThreadedConfig
{
    /// Reject settings the pool cannot run with.
    ///
    /// ## Errors
    ///
    /// [`TraceeError::InvalidArgument`] for zero workers, zero cycles or a zero
    /// block size.
    pub fn validate(&self) -> TraceeResult<()>
    {
        if self.workers == 0 {
            return Err(TraceeError::InvalidArgument("worker count must be non-zero".to_string()));
        }
        if self.cycles == 0 {
            return Err(TraceeError::InvalidArgument("cycle count must be non-zero".to_string()));
        }
        if self.block_size == 0 {
            return Err(TraceeError::InvalidArgument("block size must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Allocate/release pairs the whole pool performs
    #[must_use]
    pub fn total_cycles(&self) -> u64
    {
        self.workers as u64 * self.cycles
    }
}

/// Result of a finished [`run_threaded`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadedSummary
{
    /// Completed cycles, indexed by worker in creation order
    pub cycles_per_worker: Vec<u64>,
}

impl ThreadedSummary
{
    /// Workers that were spawned and joined
    #[must_use]
    pub fn workers(&self) -> usize
    {
        self.cycles_per_worker.len()
    }

    /// Cycles completed across all workers
    #[must_use]
    pub fn total_cycles(&self) -> u64
    {
        self.cycles_per_worker.iter().sum()
    }
}

/// Spawn the pool, wait for every worker, and report what they did.
///
/// Same as [`run_threaded_with`] with a hook that does nothing, so every
/// fault comes back as the returned error.
///
/// ## Errors
///
/// See [`run_threaded_with`].
pub fn run_threaded<A>(config: &ThreadedConfig, allocator: &Arc<A>) -> TraceeResult<ThreadedSummary>
where
    A: BlockAllocator + 'static,
{
    run_threaded_with(config, allocator, |_| {})
}

/// Spawn the pool, wait for every worker, and report what they did.
///
/// `on_fault` runs at the fault site for every resource fault: inside the
/// worker for a failed allocation, on the calling thread for a failed spawn.
/// A hook that terminates the process ends the fixture right there. A hook
/// that returns lets the run carry on to the joins.
///
/// All workers are spawned before the first join. If spawning worker `n`
/// fails, the workers already running are still joined before the error is
/// returned, so nothing outlives the call.
///
/// ## Errors
///
/// - [`TraceeError::InvalidArgument`] for an unusable config
/// - [`TraceeError::ThreadCreateFailed`] when the OS refuses a thread
/// - [`TraceeError::WorkerPanicked`] when a worker panics
/// - The first allocation fault reported by a worker
pub fn run_threaded_with<A, F>(
    config: &ThreadedConfig,
    allocator: &Arc<A>,
    on_fault: F,
) -> TraceeResult<ThreadedSummary>
where
    A: BlockAllocator + 'static,
    F: Fn(&TraceeError) + Send + Sync + 'static,
{
    config.validate()?;
    tracing::info!(
        workers = config.workers,
        cycles = config.cycles,
        block_size = config.block_size,
        "threaded fixture started"
    );

    let on_fault = Arc::new(on_fault);
    let mut handles: Vec<JoinHandle<TraceeResult<u64>>> = Vec::with_capacity(config.workers);
    let mut spawn_error = None;
    for index in 0..config.workers {
        let allocator = Arc::clone(allocator);
        let hook = Arc::clone(&on_fault);
        let (cycles, block_size) = (config.cycles, config.block_size);
        let spawned = spawn_worker(index, move || {
            run_worker(index, cycles, block_size, &*allocator).inspect_err(|err| {
                tracing::error!(index, error = %err, "worker failed");
                if err.is_resource_fault() {
                    hook(err);
                }
            })
        });

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(source) => {
                tracing::error!(index, error = %source, "failed to spawn worker");
                let err = TraceeError::ThreadCreateFailed { index, source };
                on_fault(&err);
                spawn_error = Some(err);
                break;
            }
        }
    }

    let mut cycles_per_worker = Vec::with_capacity(handles.len());
    let mut first_error = spawn_error;
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(cycles)) => {
                tracing::debug!(index, cycles, "worker joined");
                cycles_per_worker.push(cycles);
            }
            Ok(Err(err)) => {
                first_error.get_or_insert(err);
            }
            Err(_) => {
                first_error.get_or_insert(TraceeError::WorkerPanicked { index });
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    let summary = ThreadedSummary { cycles_per_worker };
    tracing::info!(
        workers = summary.workers(),
        total_cycles = summary.total_cycles(),
        "threaded fixture finished"
    );
    Ok(summary)
}

fn spawn_worker<F>(index: usize, body: F) -> io::Result<JoinHandle<TraceeResult<u64>>>
where
    F: FnOnce() -> TraceeResult<u64> + Send + 'static,
{
    #[cfg(test)]
    if tests::SPAWN_FAILS_AT.with(|at| at.get() == Some(index)) {
        return Err(io::Error::from(io::ErrorKind::WouldBlock));
    }
    thread::Builder::new().name(format!("worker-{index}")).spawn(body)
}

/// Body of one worker: `cycles` allocate/release pairs of `block_size` bytes.
///
/// Returns the number of cycles completed.
///
/// ## Errors
///
/// Stops at the first allocation fault and returns it.
#[inline(never)]
pub fn run_worker<A>(index: usize, cycles: u64, block_size: usize, allocator: &A) -> TraceeResult<u64>
where
    A: BlockAllocator + ?Sized,
{
    tracing::trace!(index, cycles, "worker started");
    for _ in 0..cycles {
        let block = allocator.allocate(block_size)?;
        allocator.release(block);
    }
    Ok(cycles)
}
