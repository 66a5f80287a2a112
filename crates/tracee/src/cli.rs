//! Flags and start-up shared by the fixture binaries.

use std::process;

use clap::Args;
use tracee_core::{AllocationStats, FaultPolicy, TraceeResult};
use tracee_utils::{info, init_logging, LogGuard};

/// How the fixture terminates on a fatal fault
#[derive(Args, Debug, Clone, Copy)]
pub struct FaultArgs
{
    /// Behaviour on allocation or thread-creation failure: `fail-fast` exits
    /// non-zero with a diagnostic, `crash` aborts the process
    #[arg(long, value_name = "POLICY", default_value_t = FaultPolicy::FailFast)]
    pub on_fault: FaultPolicy,
}

/// Allocation counter output
#[derive(Args, Debug, Clone, Copy)]
pub struct ReportArgs
{
    /// Print allocation counters to stderr before exiting
    #[arg(long, default_value_t = false)]
    pub report: bool,
}

/// Initialize logging (reads `RUST_LOG`, `TRACEE_LOG_FORMAT`, `TRACEE_LOG_FILE`).
///
/// Exits with status 1 if logging cannot be set up.
#[must_use]
pub fn setup_logging(fixture: &str) -> LogGuard
{
    match init_logging() {
        Ok(guard) => {
            info!(fixture, pid = process::id(), "fixture starting");
            guard
        }
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    }
}

/// Unwrap a fixture result, terminating through `policy` on error.
pub fn or_terminate<T>(result: TraceeResult<T>, policy: FaultPolicy) -> T
{
    match result {
        Ok(value) => value,
        Err(e) => policy.handle(&e),
    }
}

/// Print allocation counters to stderr when `--report` was given.
pub fn report(args: ReportArgs, stats: &AllocationStats)
{
    if args.report {
        eprintln!("{stats}");
    }
}

#[cfg(test)]
mod tests
{
    use clap::Parser;

    use super::*;

    #[derive(Parser, Debug)]
    struct Harness
    {
        #[command(flatten)]
        fault: FaultArgs,
        #[command(flatten)]
        report: ReportArgs,
    }

    #[test]
    fn test_defaults()
    {
        let cli = Harness::try_parse_from(["fixture"]).unwrap();
        assert_eq!(cli.fault.on_fault, FaultPolicy::FailFast);
        assert!(!cli.report.report);
    }

    #[test]
    fn test_crash_policy_and_report()
    {
        let cli = Harness::try_parse_from(["fixture", "--on-fault", "crash", "--report"]).unwrap();
        assert_eq!(cli.fault.on_fault, FaultPolicy::Crash);
        assert!(cli.report.report);
    }

    #[test]
    fn test_unknown_policy_is_rejected()
    {
        assert!(Harness::try_parse_from(["fixture", "--on-fault", "retry"]).is_err());
    }

    #[test]
    fn test_or_terminate_passes_values_through()
    {
        assert_eq!(or_terminate(Ok(7), FaultPolicy::FailFast), 7);
    }
}
