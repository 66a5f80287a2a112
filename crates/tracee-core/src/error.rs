//! # Error Types
//!
//! Faults a fixture can run into.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use std::io;

use thiserror::Error;

/// Main error type for fixture operations
///
/// The fixtures do the simplest possible thing, so there are only two real
/// fault classes: the allocator refusing a request and the OS refusing to
/// create a thread. Both are fatal; see [`crate::fault::FaultPolicy`] for how
/// a binary terminates on them.
///
/// ## Error Categories
///
/// 1. **Fatal resource errors**: AllocationFailed, ThreadCreateFailed
/// 2. **Worker errors**: WorkerPanicked
/// 3. **Setup errors**: InvalidArgument, SignalHandler
/// 4. **I/O errors**: Io (writing the `step` line)
#[derive(Error, Debug)]
pub enum TraceeError
{
    /// The allocator returned no memory for a request
    #[error("Allocation of {size} bytes failed")]
    AllocationFailed
    {
        /// Size of the rejected request in bytes
        size: usize,
    },

    /// The OS refused to create a worker thread
    #[error("Failed to create worker thread {index}: {source}")]
    ThreadCreateFailed
    {
        /// Zero-based index of the worker that could not be spawned
        index: usize,
        /// Error reported by `std::thread::Builder::spawn`
        #[source]
        source: io::Error,
    },

    /// A worker thread panicked before finishing its cycles
    #[error("Worker thread {index} panicked")]
    WorkerPanicked
    {
        /// Zero-based index of the worker
        index: usize,
    },

    /// Invalid argument passed to a fixture
    ///
    /// Examples:
    /// - A zero block size
    /// - A worker pool with no workers
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Installing the SIGINT/SIGTERM handler failed
    #[error("Failed to install signal handler: {0}")]
    SignalHandler(String),

    /// I/O error (writing to stdout)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TraceeError
{
    /// Exit status used when a binary fails fast on this error.
    ///
    /// Resource faults get their own codes so an external harness can tell
    /// them apart from ordinary failures.
    #[must_use]
    pub fn exit_code(&self) -> i32
    {
        match self {
            Self::AllocationFailed { .. } => 2,
            Self::ThreadCreateFailed { .. } => 3,
            Self::WorkerPanicked { .. } => 4,
            Self::InvalidArgument(_) | Self::SignalHandler(_) | Self::Io(_) => 1,
        }
    }

    /// Whether this error is one of the fatal resource faults.
    #[must_use]
    pub fn is_resource_fault(&self) -> bool
    {
        matches!(self, Self::AllocationFailed { .. } | Self::ThreadCreateFailed { .. })
    }
}

impl From<ctrlc::Error> for TraceeError
{
    fn from(err: ctrlc::Error) -> Self
    {
        Self::SignalHandler(err.to_string())
    }
}

/// Convenience type alias for `Result<T, TraceeError>`
///
/// ```rust
/// use tracee_core::error::TraceeResult;
/// fn foo() -> TraceeResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type TraceeResult<T> = std::result::Result<T, TraceeError>;
