//! Common module for library exports

pub use crate::alloc::{allocate_and_release, AllocationStats, Block, BlockAllocator, CountingAllocator, SystemAllocator};
pub use crate::error::{TraceeError, TraceeResult};
pub use crate::fault::FaultPolicy;
pub use crate::realloc::{run_realloc, ReallocConfig};
pub use crate::sequential::{run_sequential, SequentialConfig, SequentialSummary, StopCause};
pub use crate::shutdown::{install_signal_handler, Shutdown};
pub use crate::threaded::{run_threaded, run_threaded_with, ThreadedConfig, ThreadedSummary};
pub use crate::vectors::{run_vectors, VectorsConfig};
