//! # Tracee Utilities
//!
//! Shared utilities for the tracee fixtures.
//!
//! Currently this is the logging setup every fixture binary runs before doing
//! anything else, built on `tracing`.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogGuard, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
