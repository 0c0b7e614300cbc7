//! Interrupt handling.
//!
//! Two paths converge on the same atomic flag: an OS signal (SIGINT or
//! SIGTERM) flips the process-wide flag from a handler installed without
//! SA_RESTART, so a blocked poll call returns `Interrupted` and the loop
//! re-checks the flag; and a `ShutdownHandle` flips a per-loop flag and
//! wakes the poller directly, for tests and embedders.

use mio::Waker;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static SIGNALLED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_signum: libc::c_int) {
    SIGNALLED.store(true, Ordering::SeqCst);
}

/// Install SIGINT/SIGTERM handlers that request shutdown.
///
/// sa_flags stays zero: SA_RESTART would transparently restart some wait
/// syscalls, and the loop relies on the poll call returning `Interrupted`.
pub fn install() -> io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = 0;
        for signum in [libc::SIGINT, libc::SIGTERM] {
            if libc::sigaction(signum, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

/// Whether an interrupt signal has requested shutdown.
pub fn signalled() -> bool {
    SIGNALLED.load(Ordering::SeqCst)
}

/// Programmatic stop switch for an event loop.
///
/// Cloneable and sendable; `shutdown` may be called from any thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    pub(crate) fn new(stop: Arc<AtomicBool>, waker: Arc<Waker>) -> Self {
        Self { stop, waker }
    }

    /// Request that the loop stop and wake it if it is blocked polling.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.waker.wake();
    }
}

/// Check both stop sources for a loop owning `stop`.
pub(crate) fn requested(stop: &AtomicBool) -> bool {
    stop.load(Ordering::SeqCst) || signalled()
}
