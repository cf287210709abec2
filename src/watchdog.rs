//! Time-bounded shutdown supervision.
//!
//! Some client versions hang forever in stop/destroy. Closing the window arms
//! a countdown on its own thread that races the graceful path; whichever
//! finishes first terminates the process, and the other becomes a no-op.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use log::{error, info, warn};

/// Final action of the process.
pub trait Terminator: Send + Sync + 'static {
    /// Orderly exit after a completed shutdown.
    fn terminate(&self, code: i32);

    /// Exit that must not run any process teardown. A hung component may
    /// hold locks that atexit handlers or library destructors need.
    fn terminate_now(&self, code: i32) {
        self.terminate(code);
    }
}

/// Exits the real process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn terminate(&self, code: i32) {
        log::logger().flush();
        std::process::exit(code);
    }

    fn terminate_now(&self, code: i32) {
        log::logger().flush();
        immediate_exit(code);
    }
}

#[cfg(unix)]
fn immediate_exit(code: i32) -> ! {
    // SAFETY: `_exit` takes no locks and never returns.
    unsafe { libc::_exit(code) }
}

#[cfg(windows)]
fn immediate_exit(code: i32) -> ! {
    use windows::Win32::System::Threading::{GetCurrentProcess, TerminateProcess};

    if let Err(e) = unsafe { TerminateProcess(GetCurrentProcess(), code as u32) } {
        error!("[Watchdog] TerminateProcess failed: {}", e);
    }
    std::process::abort()
}

#[cfg(not(any(unix, windows)))]
fn immediate_exit(_code: i32) -> ! {
    std::process::abort()
}

/// Shared "process is exiting" latch. Only the first caller reaches the terminator.
#[derive(Clone)]
pub struct ExitLatch {
    fired: Arc<AtomicBool>,
    terminator: Arc<dyn Terminator>,
}

impl ExitLatch {
    pub fn new(terminator: Arc<dyn Terminator>) -> Self {
        Self { fired: Arc::new(AtomicBool::new(false)), terminator }
    }

    /// Terminates with `code` unless another path already did. Returns whether
    /// this call was the one that terminated.
    pub fn exit(&self, code: i32) -> bool {
        self.exit_with(code, || {})
    }

    /// Like [`ExitLatch::exit`], running `announce` first when this call wins.
    pub fn exit_with(&self, code: i32, announce: impl FnOnce()) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        announce();
        self.terminator.terminate(code);
        true
    }

    /// Like [`ExitLatch::exit_with`], skipping process teardown.
    pub fn force_with(&self, code: i32, announce: impl FnOnce()) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        announce();
        self.terminator.terminate_now(code);
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ExitLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitLatch").field("fired", &self.has_fired()).finish()
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownWatchdog {
    grace_period: Duration,
    latch: ExitLatch,
}

impl ShutdownWatchdog {
    pub fn new(grace_period: Duration, latch: ExitLatch) -> Self {
        Self { grace_period, latch }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Starts the countdown. Nothing is shared with the UI thread except the
    /// exit latch, so the countdown never waits on it.
    pub fn arm(&self) -> Option<thread::JoinHandle<()>> {
        let grace = self.grace_period;
        let latch = self.latch.clone();
        info!("[Watchdog] armed, forcing exit in {:?}", grace);
        let spawned = thread::Builder::new().name("shutdown-watchdog".into()).spawn(move || {
            thread::sleep(grace);
            latch.force_with(0, || {
                warn!("[Watchdog] shutdown did not finish within {:?}, forced exit", grace);
            });
        });
        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                // without a countdown the only bound left is exiting right away
                error!("[Watchdog] could not spawn countdown thread: {}", e);
                self.latch.force_with(0, || {});
                None
            }
        }
    }
}
