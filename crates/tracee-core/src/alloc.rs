//! # Block Allocation
//!
//! The heap requests the fixtures make, behind a small trait so the same
//! fixture code can run against the real C heap (what a tracer hooks) or an
//! instrumented wrapper (what our tests count).
//!
//! ## Why call `malloc` directly?
//!
//! Allocation tracers usually hook or breakpoint `malloc`/`free`/`realloc`.
//! Going through `libc` keeps exactly one allocator call per request, with the
//! requested size unchanged, and no Rust allocator shim in between.

use std::fmt;
use std::hint::black_box;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::{TraceeError, TraceeResult};

/// An owned heap block
///
/// A block is created by a [`BlockAllocator`] and must be handed back to the
/// same allocator through [`BlockAllocator::release`]. It is never cloned, so a
/// block can only be released once.
#[derive(Debug)]
pub struct Block
{
    ptr: NonNull<u8>,
    size: usize,
}

// SAFETY: a block is plain heap memory owned by exactly one holder; moving the
// owner between threads is fine, `malloc`/`free` are thread-safe.
unsafe impl Send for Block {}

impl Block
{
    /// Wrap a raw allocation.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live allocation of at least `size` bytes that the
    /// allocator receiving this block in `release`/`resize` is able to free.
    #[must_use]
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, size: usize) -> Self
    {
        Self { ptr, size }
    }

    /// Requested size in bytes
    #[must_use]
    pub fn size(&self) -> usize
    {
        self.size
    }

    /// Start address of the block
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8
    {
        self.ptr.as_ptr()
    }

    fn into_raw(self) -> *mut libc::c_void
    {
        self.ptr.as_ptr().cast()
    }
}

/// Source of heap blocks for the fixtures
///
/// Implementations must be shareable across worker threads.
pub trait BlockAllocator: Send + Sync
{
    /// Request exactly `size` bytes.
    ///
    /// ## Errors
    ///
    /// - [`TraceeError::InvalidArgument`] for a zero size
    /// - [`TraceeError::AllocationFailed`] when the heap has no memory
    fn allocate(&self, size: usize) -> TraceeResult<Block>;

    /// Give a block back to the heap.
    fn release(&self, block: Block);

    /// Move a block to a new size, keeping its leading bytes.
    ///
    /// The default implementation allocates a fresh block, copies, and
    /// releases the old one. If the new request fails the old block is
    /// released before the error is returned.
    ///
    /// ## Errors
    ///
    /// Same as [`BlockAllocator::allocate`].
    fn resize(&self, block: Block, new_size: usize) -> TraceeResult<Block>
    {
        let fresh = match self.allocate(new_size) {
            Ok(fresh) => fresh,
            Err(err) => {
                self.release(block);
                return Err(err);
            }
        };
        // SAFETY: both blocks are live and distinct; the copy length fits either one.
        unsafe {
            ptr::copy_nonoverlapping(block.as_ptr(), fresh.as_ptr(), block.size().min(new_size));
        }
        self.release(block);
        Ok(fresh)
    }
}

/// The process heap, through `malloc`/`realloc`/`free`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl BlockAllocator for SystemAllocator
{
    #[inline(never)]
    fn allocate(&self, size: usize) -> TraceeResult<Block>
    {
        if size == 0 {
            return Err(TraceeError::InvalidArgument("block size must be non-zero".to_string()));
        }

        // SAFETY: plain C heap request; a null return is handled below.
        let raw = black_box(unsafe { libc::malloc(size) });
        let ptr = NonNull::new(raw.cast::<u8>()).ok_or(TraceeError::AllocationFailed { size })?;

        tracing::trace!(size, addr = ?ptr, "allocated block");
        // SAFETY: `ptr` came from `malloc(size)` and is freed with `free`.
        Ok(unsafe { Block::from_raw_parts(ptr, size) })
    }

    #[inline(never)]
    fn release(&self, block: Block)
    {
        tracing::trace!(size = block.size(), addr = ?block.ptr, "releasing block");
        // SAFETY: every block this allocator hands out came from `malloc`/`realloc`.
        unsafe { libc::free(black_box(block.into_raw())) };
    }

    #[inline(never)]
    fn resize(&self, block: Block, new_size: usize) -> TraceeResult<Block>
    {
        if new_size == 0 {
            self.release(block);
            return Err(TraceeError::InvalidArgument("block size must be non-zero".to_string()));
        }

        let old = block.into_raw();
        // SAFETY: `old` is a live heap allocation; on failure it stays valid.
        let raw = black_box(unsafe { libc::realloc(old, new_size) });
        let Some(ptr) = NonNull::new(raw.cast::<u8>()) else {
            // SAFETY: realloc failure leaves `old` untouched and still ours.
            unsafe { libc::free(old) };
            return Err(TraceeError::AllocationFailed { size: new_size });
        };

        tracing::trace!(size = new_size, addr = ?ptr, "resized block");
        // SAFETY: `ptr` came from `realloc(old, new_size)`.
        Ok(unsafe { Block::from_raw_parts(ptr, new_size) })
    }
}

/// Snapshot of a [`CountingAllocator`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationStats
{
    /// Successful allocation requests (including the new side of a resize)
    pub allocations: u64,
    /// Releases (including the old side of a resize)
    pub releases: u64,
    /// Total bytes handed out over the lifetime of the allocator
    pub bytes_allocated: u64,
    /// Blocks currently live
    pub live_blocks: usize,
    /// Highest number of blocks live at the same time
    pub peak_live_blocks: usize,
}

impl AllocationStats
{
    /// Every allocation has been matched by a release.
    #[must_use]
    pub fn is_balanced(&self) -> bool
    {
        self.allocations == self.releases && self.live_blocks == 0
    }
}

impl fmt::Display for AllocationStats
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(
            f,
            "allocations={} releases={} bytes={} live={} peak_live={}",
            self.allocations, self.releases, self.bytes_allocated, self.live_blocks, self.peak_live_blocks
        )
    }
}

/// Wraps another allocator and counts what goes through it
#[derive(Debug, Default)]
pub struct CountingAllocator<A = SystemAllocator>
{
    inner: A,
    allocations: AtomicU64,
    releases: AtomicU64,
    bytes_allocated: AtomicU64,
    live_blocks: AtomicUsize,
    peak_live_blocks: AtomicUsize,
}

impl<A: BlockAllocator> CountingAllocator<A>
{
    /// Start counting on top of `inner`.
    pub fn new(inner: A) -> Self
    {
        Self {
            inner,
            allocations: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            bytes_allocated: AtomicU64::new(0),
            live_blocks: AtomicUsize::new(0),
            peak_live_blocks: AtomicUsize::new(0),
        }
    }

    /// Current counters
    #[must_use]
    pub fn snapshot(&self) -> AllocationStats
    {
        AllocationStats {
            allocations: self.allocations.load(Ordering::Acquire),
            releases: self.releases.load(Ordering::Acquire),
            bytes_allocated: self.bytes_allocated.load(Ordering::Acquire),
            live_blocks: self.live_blocks.load(Ordering::Acquire),
            peak_live_blocks: self.peak_live_blocks.load(Ordering::Acquire),
        }
    }

    fn record_allocation(&self, size: usize)
    {
        self.allocations.fetch_add(1, Ordering::AcqRel);
        self.bytes_allocated.fetch_add(size as u64, Ordering::AcqRel);
        let live = self.live_blocks.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_live_blocks.fetch_max(live, Ordering::AcqRel);
    }

    fn record_release(&self)
    {
        self.releases.fetch_add(1, Ordering::AcqRel);
        self.live_blocks.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<A: BlockAllocator> BlockAllocator for CountingAllocator<A>
{
    fn allocate(&self, size: usize) -> TraceeResult<Block>
    {
        let block = self.inner.allocate(size)?;
        self.record_allocation(size);
        Ok(block)
    }

    fn release(&self, block: Block)
    {
        self.inner.release(block);
        self.record_release();
    }

    fn resize(&self, block: Block, new_size: usize) -> TraceeResult<Block>
    {
        // The old block is gone whether or not the resize succeeds.
        let result = self.inner.resize(block, new_size);
        self.record_release();
        let block = result?;
        self.record_allocation(new_size);
        Ok(block)
    }
}

/// One matched allocate/release pair of `size` bytes.
///
/// ## Errors
///
/// Propagates the allocator's error; nothing is left allocated in that case.
pub fn allocate_and_release<A: BlockAllocator + ?Sized>(allocator: &A, size: usize) -> TraceeResult<()>
{
    let block = allocator.allocate(size)?;
    allocator.release(block);
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    /// Allocator that refuses every request
    struct EmptyHeap;

    impl BlockAllocator for EmptyHeap
    {
        fn allocate(&self, size: usize) -> TraceeResult<Block>
        {
            Err(TraceeError::AllocationFailed { size })
        }

        fn release(&self, _block: Block)
        {
            unreachable!("nothing was ever allocated");
        }
    }

    #[test]
    fn test_system_allocator_round_trip()
    {
        let block = SystemAllocator.allocate(4096).unwrap();
        assert_eq!(block.size(), 4096);
        assert!(!block.as_ptr().is_null());
        SystemAllocator.release(block);
    }

    #[test]
    fn test_system_allocator_rejects_zero_size()
    {
        let err = SystemAllocator.allocate(0).unwrap_err();
        assert!(matches!(err, TraceeError::InvalidArgument(_)));
    }

    #[test]
    fn test_system_resize_keeps_contents()
    {
        let block = SystemAllocator.allocate(16).unwrap();
        unsafe { ptr::write_bytes(block.as_ptr(), 0xab, 16) };

        let block = SystemAllocator.resize(block, 64 * 1024).unwrap();
        assert_eq!(block.size(), 64 * 1024);
        let head = unsafe { std::slice::from_raw_parts(block.as_ptr(), 16) };
        assert!(head.iter().all(|b| *b == 0xab));
        SystemAllocator.release(block);
    }

    #[test]
    fn test_counting_allocator_tracks_pairs()
    {
        let counting = CountingAllocator::new(SystemAllocator);
        for _ in 0..10 {
            allocate_and_release(&counting, 1024).unwrap();
        }

        let stats = counting.snapshot();
        assert_eq!(stats.allocations, 10);
        assert_eq!(stats.releases, 10);
        assert_eq!(stats.bytes_allocated, 10 * 1024);
        assert_eq!(stats.peak_live_blocks, 1);
        assert!(stats.is_balanced());
    }

    #[test]
    fn test_counting_allocator_peak()
    {
        let counting = CountingAllocator::new(SystemAllocator);
        let a = counting.allocate(32).unwrap();
        let b = counting.allocate(32).unwrap();
        assert_eq!(counting.snapshot().live_blocks, 2);
        counting.release(a);
        counting.release(b);

        let stats = counting.snapshot();
        assert_eq!(stats.peak_live_blocks, 2);
        assert!(stats.is_balanced());
    }

    #[test]
    fn test_counting_allocator_resize_is_one_swap()
    {
        let counting = CountingAllocator::new(SystemAllocator);
        let block = counting.allocate(1024).unwrap();
        let block = counting.resize(block, 2048).unwrap();
        counting.release(block);

        let stats = counting.snapshot();
        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.releases, 2);
        assert_eq!(stats.bytes_allocated, 3072);
        assert_eq!(stats.peak_live_blocks, 1);
    }

    #[test]
    fn test_failed_allocation_is_not_counted()
    {
        let counting = CountingAllocator::new(EmptyHeap);
        let err = allocate_and_release(&counting, 512).unwrap_err();
        assert!(matches!(err, TraceeError::AllocationFailed { size: 512 }));
        assert_eq!(counting.snapshot(), AllocationStats::default());
    }

    #[test]
    fn test_stats_display()
    {
        let stats = AllocationStats {
            allocations: 3,
            releases: 3,
            bytes_allocated: 96,
            live_blocks: 0,
            peak_live_blocks: 1,
        };
        assert_eq!(stats.to_string(), "allocations=3 releases=3 bytes=96 live=0 peak_live=1");
    }
}
