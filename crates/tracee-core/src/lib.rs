//! # tracee-core
//!
//! Fixture engines for programs that exist only to be watched.
//!
//! An allocation tracer, memory profiler or debugger needs targets that do the
//! same simple thing over and over. This crate provides those behaviours:
//! - [`sequential`]: endless allocate/release/`step` loop with a pause
//! - [`threaded`]: pool of workers doing fixed allocate/release cycles
//! - [`vectors`]: `Vec` allocations through the global allocator
//! - [`realloc`]: one block grown by repeated reallocation
//!
//! The binaries in the `tracee` crate wire these to `main`.
//!
//! ## Why unsafe code is needed
//!
//! The fixtures talk to the C heap directly (`malloc`, `realloc`, `free`) so
//! that a tracer hooking those symbols sees exactly the requests we make. The
//! raw pointers are wrapped in [`alloc::Block`], which is owned and released
//! exactly once.

#![allow(unsafe_code)] // Required for direct C heap calls

pub mod alloc;
pub mod error;
pub mod fault;
pub mod prelude;
pub mod realloc;
pub mod sequential;
pub mod shutdown;
pub mod threaded;
pub mod vectors;

pub use alloc::{AllocationStats, Block, BlockAllocator, CountingAllocator, SystemAllocator};
// Re-export commonly used types
pub use error::{TraceeError, TraceeResult};
pub use fault::FaultPolicy;
pub use shutdown::{install_signal_handler, Shutdown};
