//! Cooperative shutdown for the long-running fixture.
//!
//! `ctrlc` delivers SIGINT/SIGTERM on its own thread, which flips a shared
//! flag and wakes anything sleeping in [`Shutdown::wait_timeout`]. A SIGKILL
//! still takes the process down the hard way.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::error::TraceeResult;

static SIGNAL_SHUTDOWN: OnceCell<Shutdown> = OnceCell::new();

/// Shared shutdown request
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Shutdown
{
    inner: Arc<ShutdownState>,
}

#[derive(Debug, Default)]
struct ShutdownState
{
    requested: Mutex<bool>,
    wake: Condvar,
}

impl Shutdown
{
    /// A flag nobody has raised yet.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Ask every holder to stop. Calling it again has no further effect.
    pub fn request(&self)
    {
        let mut requested = self.inner.requested.lock().unwrap_or_else(PoisonError::into_inner);
        *requested = true;
        self.inner.wake.notify_all();
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn is_requested(&self) -> bool
    {
        *self.inner.requested.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `timeout`, or less if a stop is requested meanwhile.
    ///
    /// Returns `true` when a stop was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool
    {
        let requested = self.inner.requested.lock().unwrap_or_else(PoisonError::into_inner);
        let (requested, _) = self
            .inner
            .wake
            .wait_timeout_while(requested, timeout, |requested| !*requested)
            .unwrap_or_else(PoisonError::into_inner);
        *requested
    }
}

/// Route SIGINT and SIGTERM into a process-wide [`Shutdown`].
///
/// The handler is installed on the first call; later calls return the same
/// handle.
///
/// ## Errors
///
/// Returns [`crate::TraceeError::SignalHandler`] if another handler was
/// already registered with `ctrlc` or the OS refused the registration.
pub fn install_signal_handler() -> TraceeResult<Shutdown>
{
    SIGNAL_SHUTDOWN
        .get_or_try_init(|| -> TraceeResult<Shutdown> {
            let shutdown = Shutdown::new();
            let handle = shutdown.clone();
            ctrlc::set_handler(move || {
                tracing::info!("shutdown signal received");
                handle.request();
            })?;
            tracing::debug!("signal handler installed");
            Ok(shutdown)
        })
        .cloned()
}
