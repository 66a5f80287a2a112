//! Growth-by-reallocation fixture.
//!
//! Each round starts one block small and doubles it in place (or wherever the
//! heap moves it) until it reaches the maximum size, then releases it. Every
//! round leaves nothing behind.

use crate::alloc::BlockAllocator;
use crate::error::{TraceeError, TraceeResult};

/// Rounds per run
pub const DEFAULT_ROUNDS: u64 = 2;

/// First request of a round (1 KiB)
pub const DEFAULT_INITIAL_SIZE: usize = 1024;

/// Size a round grows to (512 KiB)
pub const DEFAULT_MAX_SIZE: usize = 512 * 1024;

/// Settings for [`run_realloc`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReallocConfig
{
    /// Grow-and-release rounds
    pub rounds: u64,
    /// First request of each round
    pub initial_size: usize,
    /// Final size of each round
    pub max_size: usize,
}

impl Default for ReallocConfig
{
    fn default() -> Self
    {
        Self {
            rounds: DEFAULT_ROUNDS,
            initial_size: DEFAULT_INITIAL_SIZE,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl ReallocConfig
{
    /// Reject settings a round cannot grow with.
    ///
    /// ## Errors
    ///
    /// [`TraceeError::InvalidArgument`] for zero rounds, a zero initial size
    /// or a maximum below the initial size.
    pub fn validate(&self) -> TraceeResult<()>
    {
        if self.rounds == 0 {
            return Err(TraceeError::InvalidArgument("round count must be non-zero".to_string()));
        }
        if self.initial_size == 0 {
            return Err(TraceeError::InvalidArgument("initial size must be non-zero".to_string()));
        }
        if self.max_size < self.initial_size {
            return Err(TraceeError::InvalidArgument(format!(
                "max size {} is below initial size {}",
                self.max_size, self.initial_size
            )));
        }
        Ok(())
    }

    /// Sizes requested in one round, first allocation included
    #[must_use]
    pub fn round_sizes(&self) -> Vec<usize>
    {
        let mut sizes = vec![self.initial_size];
        let mut size = self.initial_size;
        while size < self.max_size {
            size = size.saturating_mul(2).min(self.max_size);
            sizes.push(size);
        }
        sizes
    }
}

/// Run every round. Returns the number of allocator requests made.
///
/// ## Errors
///
/// - [`TraceeError::InvalidArgument`] for an unusable config
/// - Allocation faults from `allocator`
pub fn run_realloc<A>(config: &ReallocConfig, allocator: &A) -> TraceeResult<u64>
where
    A: BlockAllocator + ?Sized,
{
    config.validate()?;
    let sizes = config.round_sizes();
    tracing::info!(
        rounds = config.rounds,
        requests_per_round = sizes.len(),
        "realloc fixture started"
    );

    let mut requests = 0u64;
    for round in 0..config.rounds {
        requests += grow(allocator, &sizes)?;
        tracing::debug!(round, "round released");
    }
    Ok(requests)
}

#[inline(never)]
fn grow<A>(allocator: &A, sizes: &[usize]) -> TraceeResult<u64>
where
    A: BlockAllocator + ?Sized,
{
    let Some((&first, rest)) = sizes.split_first() else {
        return Ok(0);
    };

    let mut block = allocator.allocate(first)?;
    for &size in rest {
        block = allocator.resize(block, size)?;
    }
    allocator.release(block);
    Ok(sizes.len() as u64)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::alloc::{CountingAllocator, SystemAllocator};

    #[test]
    fn test_default_round_doubles_to_512k()
    {
        let sizes = ReallocConfig::default().round_sizes();
        assert_eq!(sizes.len(), 10);
        assert_eq!(sizes.first(), Some(&1024));
        assert_eq!(sizes.last(), Some(&(512 * 1024)));
        assert!(sizes.windows(2).all(|w| w[1] == w[0] * 2));
    }

    #[test]
    fn test_uneven_maximum_is_clamped()
    {
        let config = ReallocConfig {
            rounds: 1,
            initial_size: 100,
            max_size: 300,
        };
        assert_eq!(config.round_sizes(), vec![100, 200, 300]);
    }

    #[test]
    fn test_default_run_makes_twenty_requests()
    {
        let allocator = CountingAllocator::new(SystemAllocator);

        let requests = run_realloc(&ReallocConfig::default(), &allocator).unwrap();

        assert_eq!(requests, 20);
        let stats = allocator.snapshot();
        assert_eq!(stats.allocations, 20);
        assert_eq!(stats.peak_live_blocks, 1);
        assert!(stats.is_balanced());
    }

    #[test]
    fn test_zero_rounds_are_rejected()
    {
        let allocator = CountingAllocator::new(SystemAllocator);
        let config = ReallocConfig {
            rounds: 0,
            ..ReallocConfig::default()
        };
        assert!(matches!(
            run_realloc(&config, &allocator),
            Err(TraceeError::InvalidArgument(_))
        ));
        assert_eq!(allocator.snapshot().allocations, 0);
    }

    #[test]
    fn test_max_below_initial_is_rejected()
    {
        let config = ReallocConfig {
            rounds: 1,
            initial_size: 4096,
            max_size: 1024,
        };
        assert!(matches!(
            run_realloc(&config, &SystemAllocator),
            Err(TraceeError::InvalidArgument(_))
        ));
    }
}
