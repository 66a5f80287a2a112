//! Rust-native allocation fixture.
//!
//! Same allocate/drop pattern as the other fixtures, but through `Vec` and the
//! global allocator, so a tracer has to see through Rust's allocator shims and
//! demangle Rust frames (`iter` shows up in the stack).
//!
//! Each vector is requested zeroed, the way `vec![0; n]` does it, so the
//! tracer sees the allocator's zeroing entry point (`calloc` under the system
//! allocator) rather than a `malloc` plus a fill.

use std::alloc::{self, Layout};
use std::hint::black_box;

use crate::error::{TraceeError, TraceeResult};

/// Vectors built per run
pub const DEFAULT_ITERATIONS: u64 = 1024;

/// Bytes per vector (1 MiB)
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Settings for [`run_vectors`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorsConfig
{
    /// Vectors to build and drop
    pub iterations: u64,
    /// Length of each zero-filled vector
    pub block_size: usize,
}

impl Default for VectorsConfig
{
    fn default() -> Self
    {
        Self {
            iterations: DEFAULT_ITERATIONS,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl VectorsConfig
{
    /// Reject settings the fixture cannot run with.
    ///
    /// ## Errors
    ///
    /// [`TraceeError::InvalidArgument`] for zero iterations or a zero block size.
    pub fn validate(&self) -> TraceeResult<()>
    {
        if self.iterations == 0 {
            return Err(TraceeError::InvalidArgument("iteration count must be non-zero".to_string()));
        }
        if self.block_size == 0 {
            return Err(TraceeError::InvalidArgument("block size must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Build and drop `iterations` zero-filled vectors. Returns how many were built.
///
/// ## Errors
///
/// - [`TraceeError::InvalidArgument`] for an unusable config
/// - [`TraceeError::AllocationFailed`] if a vector cannot be allocated
pub fn run_vectors(config: &VectorsConfig) -> TraceeResult<u64>
{
    config.validate()?;

    tracing::info!(
        iterations = config.iterations,
        block_size = config.block_size,
        "vectors fixture started"
    );
    for i in 0..config.iterations {
        drop(black_box(iter(i, config.block_size)?));
    }
    Ok(config.iterations)
}

#[inline(never)]
fn iter(_: u64, size: usize) -> TraceeResult<Vec<u8>>
{
    if size == 0 {
        return Ok(Vec::new());
    }
    let layout = Layout::array::<u8>(size).map_err(|_| TraceeError::AllocationFailed { size })?;

    // SAFETY: the layout has a non-zero size.
    let ptr = unsafe { alloc::alloc_zeroed(layout) };
    if ptr.is_null() {
        return Err(TraceeError::AllocationFailed { size });
    }

    // SAFETY: `ptr` comes from the global allocator with `layout`, which is
    // exactly the layout of a `Vec<u8>` with capacity `size`, and all `size`
    // bytes were zeroed.
    Ok(unsafe { Vec::from_raw_parts(ptr, size, size) })
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_builds_requested_vectors()
    {
        let config = VectorsConfig {
            iterations: 16,
            block_size: 4096,
        };
        assert_eq!(run_vectors(&config).unwrap(), 16);
    }

    #[test]
    fn test_iter_is_zero_filled()
    {
        let block = iter(0, 256).unwrap();
        assert_eq!(block.len(), 256);
        assert_eq!(block.capacity(), 256);
        assert!(block.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_huge_request_fails_cleanly()
    {
        let err = iter(0, usize::MAX).unwrap_err();
        assert!(matches!(err, TraceeError::AllocationFailed { size: usize::MAX }));
    }

    #[test]
    fn test_zero_iterations_are_rejected()
    {
        let config = VectorsConfig {
            iterations: 0,
            ..VectorsConfig::default()
        };
        assert!(matches!(run_vectors(&config), Err(TraceeError::InvalidArgument(_))));
    }

    #[test]
    fn test_zero_block_size_is_rejected()
    {
        let config = VectorsConfig {
            block_size: 0,
            ..VectorsConfig::default()
        };
        assert!(matches!(run_vectors(&config), Err(TraceeError::InvalidArgument(_))));
    }
}
