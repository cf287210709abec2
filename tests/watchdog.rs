mod support;

use std::{
    process::{Command, ExitStatus},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use client_host_embedder::{
    host::{Dimension, HostedComponent},
    watchdog::{ExitLatch, ProcessTerminator, ShutdownWatchdog},
    window::{HostingOptions, WindowController},
};
use support::{FakeWindow, FakeWindowFactory, Journal, RecordingComponent, RecordingTerminator};

const CHILD_ENV: &str = "CLIENT_HOST_EMBEDDER_WATCHDOG_CHILD";
const CHILD_BOUND: Duration = Duration::from_secs(15);

fn options() -> HostingOptions {
    HostingOptions {
        document_base: "http://www.minecraft.net/game".to_string(),
        default_parameters: Default::default(),
    }
}

fn hosted(
    journal: &Journal,
    component: impl HostedComponent + 'static,
    grace: Duration,
    latch: ExitLatch,
) -> WindowController<FakeWindow> {
    let factory = FakeWindowFactory::new(journal, Vec::new());
    let watchdog = ShutdownWatchdog::new(grace, latch.clone());
    let mut controller =
        WindowController::create(&factory, "Client", options(), watchdog, latch).unwrap();
    controller
        .start(Box::new(component), "alice", "tok", Dimension::new(854, 480), false)
        .unwrap();
    controller
}

/// Whether this process is the child spawned for `test_name`.
fn is_child(test_name: &str) -> bool {
    std::env::var(CHILD_ENV).as_deref() == Ok(test_name)
}

/// Re-runs this test binary filtered to `test_name`. `None` means the child
/// was still alive after the bound and had to be killed.
fn run_child(test_name: &str) -> Option<ExitStatus> {
    let mut child = Command::new(std::env::current_exe().unwrap())
        .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, test_name)
        .spawn()
        .unwrap();
    let deadline = Instant::now() + CHILD_BOUND;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return Some(status);
        }
        thread::sleep(Duration::from_millis(20));
    }
    let _ = child.kill();
    let _ = child.wait();
    None
}

#[test]
fn latch_terminates_once() {
    let journal = Journal::default();
    let latch = ExitLatch::new(RecordingTerminator::new(&journal));
    assert!(latch.exit(0));
    assert!(!latch.clone().exit(1));
    assert!(!latch.force_with(0, || {}));
    assert!(latch.has_fired());
    assert_eq!(journal.entries(), vec!["exit 0"]);
}

#[test]
fn countdown_forces_exit_when_nothing_else_does() {
    let journal = Journal::default();
    let latch = ExitLatch::new(RecordingTerminator::new(&journal));
    let watchdog = ShutdownWatchdog::new(Duration::from_millis(20), latch);

    watchdog.arm().unwrap().join().unwrap();
    assert_eq!(journal.entries(), vec!["forced exit 0"]);
}

#[test]
fn slow_stop_is_overtaken_by_the_watchdog() {
    let journal = Journal::default();
    let latch = ExitLatch::new(RecordingTerminator::new(&journal));
    let component = RecordingComponent::new(&journal).with_stop_delay(Duration::from_millis(400));
    let mut controller = hosted(&journal, component, Duration::from_millis(50), latch);

    controller.on_window_close();

    let forced = journal.position("forced exit 0").unwrap();
    let stopped = journal.position("stop").unwrap();
    assert!(forced < stopped, "{:?}", journal.entries());
    assert_eq!(journal.count("forced exit 0"), 1);
    assert_eq!(journal.count("exit 0"), 0);
    assert_eq!(journal.count("destroy"), 1);
}

#[test]
fn graceful_close_beats_the_watchdog() {
    let journal = Journal::default();
    let latch = ExitLatch::new(RecordingTerminator::new(&journal));
    let mut controller =
        hosted(&journal, RecordingComponent::new(&journal), Duration::from_millis(50), latch);

    controller.on_window_close();
    thread::sleep(Duration::from_millis(200));

    let entries = journal.entries();
    assert_eq!(&entries[entries.len() - 3..], ["stop", "destroy", "exit 0"]);
    assert_eq!(journal.count("exit 0"), 1);
    assert_eq!(journal.count("forced exit 0"), 0);
}

#[test]
fn hung_shutdown_child() {
    if !is_child("hung_shutdown_child") {
        return;
    }
    let journal = Journal::default();
    let latch = ExitLatch::new(Arc::new(ProcessTerminator));
    let component = RecordingComponent::new(&journal).with_stop_delay(Duration::from_secs(3600));
    let mut controller = hosted(&journal, component, Duration::from_millis(200), latch);

    controller.on_window_close();
    // only reached if the watchdog failed to end the process
    std::process::exit(42);
}

#[test]
fn hung_shutdown_is_forced_to_exit() {
    let status = run_child("hung_shutdown_child");
    assert_eq!(status.and_then(|s| s.code()), Some(0), "child status {status:?}");
}

#[cfg(unix)]
mod teardown {
    use super::*;

    use parking_lot::{Mutex, const_mutex};

    use client_host_embedder::host::StubHandle;

    /// Lock shared by the hung component and an exit-time handler.
    static TEARDOWN_LOCK: Mutex<()> = const_mutex(());

    extern "C" fn lock_on_teardown() {
        let _guard = TEARDOWN_LOCK.lock();
    }

    /// Holds the teardown lock forever once stopped.
    struct LockHoldingComponent;

    impl HostedComponent for LockHoldingComponent {
        fn set_stub(&mut self, _stub: StubHandle) {}
        fn init(&mut self) {}
        fn start(&mut self) {}

        fn stop(&mut self) {
            let _guard = TEARDOWN_LOCK.lock();
            loop {
                thread::sleep(Duration::from_secs(3600));
            }
        }

        fn destroy(&mut self) {}
        fn resize(&mut self, _width: i32, _height: i32) {}
        fn set_visible(&mut self, _visible: bool) {}

        fn code_base(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn lock_holding_shutdown_child() {
        if !is_child("teardown::lock_holding_shutdown_child") {
            return;
        }
        assert_eq!(unsafe { libc::atexit(lock_on_teardown) }, 0);
        let journal = Journal::default();
        let latch = ExitLatch::new(Arc::new(ProcessTerminator));
        let mut controller =
            hosted(&journal, LockHoldingComponent, Duration::from_millis(200), latch);

        controller.on_window_close();
        std::process::exit(42);
    }

    #[test]
    fn forced_exit_skips_exit_handlers() {
        let status = run_child("teardown::lock_holding_shutdown_child");
        assert_eq!(status.and_then(|s| s.code()), Some(0), "child status {status:?}");
    }
}
