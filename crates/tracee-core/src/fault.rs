//! How a fixture dies when the heap or the thread table runs dry.
//!
//! Neither fault is recoverable for a fixture. The only choice is the way the
//! process goes down, which matters to the tool watching it: a clean non-zero
//! exit with a diagnostic, or an abort the tool can catch as a crash signal.

use std::fmt;
use std::process;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use crate::error::TraceeError;

/// Held by the thread taking the process down; later faults wait on it.
static TERMINATING: Mutex<()> = Mutex::new(());

/// Termination policy for fatal faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy
{
    /// Log a diagnostic and exit with [`TraceeError::exit_code`] (default)
    #[default]
    FailFast,
    /// Abort the process with `SIGABRT`
    Crash,
}

impl FaultPolicy
{
    /// Whether `error` takes the process down with an abort.
    ///
    /// Only resource faults crash. Setup mistakes and I/O errors always fail
    /// fast, whatever the policy.
    #[must_use]
    pub fn aborts_on(self, error: &TraceeError) -> bool
    {
        self == Self::Crash && error.is_resource_fault()
    }

    /// Terminate the process according to the policy.
    ///
    /// Safe to call from several threads at once: the first caller terminates
    /// the process and the others block until it is gone.
    pub fn handle(self, error: &TraceeError) -> !
    {
        let _terminating = TERMINATING.lock().unwrap_or_else(PoisonError::into_inner);
        if self.aborts_on(error) {
            tracing::error!(error = %error, "fixture aborting");
            process::abort();
        }
        tracing::error!(error = %error, code = error.exit_code(), "fixture failed");
        eprintln!("fatal: {error}");
        process::exit(error.exit_code());
    }
}

impl FromStr for FaultPolicy
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Ok(Self::FailFast),
            "crash" | "abort" => Ok(Self::Crash),
            _ => Err(format!("Unknown fault policy: {s}. Use 'fail-fast' or 'crash'")),
        }
    }
}

impl fmt::Display for FaultPolicy
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::FailFast => f.write_str("fail-fast"),
            Self::Crash => f.write_str("crash"),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_fault_policy_from_str()
    {
        assert_eq!(FaultPolicy::from_str("fail-fast").unwrap(), FaultPolicy::FailFast);
        assert_eq!(FaultPolicy::from_str("FAILFAST").unwrap(), FaultPolicy::FailFast);
        assert_eq!(FaultPolicy::from_str("fail_fast").unwrap(), FaultPolicy::FailFast);
        assert_eq!(FaultPolicy::from_str("crash").unwrap(), FaultPolicy::Crash);
        assert_eq!(FaultPolicy::from_str("abort").unwrap(), FaultPolicy::Crash);
        assert!(FaultPolicy::from_str("retry").is_err());
    }

    #[test]
    fn test_fault_policy_display_round_trips()
    {
        for policy in [FaultPolicy::FailFast, FaultPolicy::Crash] {
            assert_eq!(policy.to_string().parse::<FaultPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_only_resource_faults_crash()
    {
        let alloc = TraceeError::AllocationFailed { size: 64 };
        let thread = TraceeError::ThreadCreateFailed {
            index: 0,
            source: std::io::Error::from(std::io::ErrorKind::WouldBlock),
        };
        let usage = TraceeError::InvalidArgument("block size must be non-zero".to_string());
        let panicked = TraceeError::WorkerPanicked { index: 1 };

        assert!(FaultPolicy::Crash.aborts_on(&alloc));
        assert!(FaultPolicy::Crash.aborts_on(&thread));
        assert!(!FaultPolicy::Crash.aborts_on(&usage));
        assert!(!FaultPolicy::Crash.aborts_on(&panicked));
        assert!(!FaultPolicy::FailFast.aborts_on(&alloc));
    }

    #[test]
    fn test_default_is_fail_fast()
    {
        assert_eq!(FaultPolicy::default(), FaultPolicy::FailFast);
    }
}
