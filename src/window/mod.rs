//! The native top-level window and the controller that hosts the component
//! inside it.
//!
//! - Creates the window at the bare-frame size, centered on the primary display
//! - Builds the host stub, seeds its parameters and lays out the surface
//! - Runs `init` then `start` only after the surface is attached and laid out
//! - On close, races stop/destroy against the shutdown watchdog

#[cfg(windows)]
pub mod win32;
pub mod headless;

use std::collections::BTreeMap;

use anyhow::Result;
use log::{info, warn};

use crate::{
    constants::{INITIAL_FRAME_HEIGHT, INITIAL_FRAME_WIDTH},
    host::{Dimension, HostStub, HostedComponent, LifecycleError, ParameterStore, Surface},
    watchdog::{ExitLatch, ShutdownWatchdog},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Resized(Dimension),
    CloseRequested,
}

/// A native top-level window able to host one component surface.
pub trait NativeWindow {
    fn set_size(&mut self, size: Dimension);
    fn center(&mut self);
    fn maximize(&mut self);
    /// Lays out the window so that its client area has its final size.
    fn validate(&mut self);
    /// The client area the component renders into.
    fn surface(&self) -> Surface;
    fn set_visible(&mut self, visible: bool);
    /// Blocks for the next event. `None` means the event source is gone,
    /// which is handled like a close request.
    fn next_event(&mut self) -> Option<WindowEvent>;
}

pub trait WindowFactory {
    type Window: NativeWindow;

    fn create(&self, title: &str, size: Dimension) -> Result<Self::Window>;
}

/// Process-level phase, advancing strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HostPhase {
    WindowCreated,
    Hosting,
    Closing,
    Terminated,
}

/// What the stub reports to the component besides the seeded parameters.
#[derive(Debug, Clone)]
pub struct HostingOptions {
    pub document_base: String,
    pub default_parameters: BTreeMap<String, String>,
}

pub struct WindowController<W: NativeWindow> {
    window: W,
    stub: Option<HostStub>,
    options: HostingOptions,
    watchdog: ShutdownWatchdog,
    latch: ExitLatch,
    phase: HostPhase,
}

impl<W: NativeWindow> WindowController<W> {
    pub fn create<F>(
        factory: &F,
        title: &str,
        options: HostingOptions,
        watchdog: ShutdownWatchdog,
        latch: ExitLatch,
    ) -> Result<Self>
    where
        F: WindowFactory<Window = W>,
    {
        let mut window =
            factory.create(title, Dimension::new(INITIAL_FRAME_WIDTH, INITIAL_FRAME_HEIGHT))?;
        window.center();
        info!("[Window] created `{}`", title);
        Ok(Self { window, stub: None, options, watchdog, latch, phase: HostPhase::WindowCreated })
    }

    /// Hosts `component` and brings it up. Ordering matters: some components
    /// query their surface size during `init`, so the surface is laid out and
    /// attached first.
    pub fn start(
        &mut self,
        component: Box<dyn HostedComponent>,
        username: &str,
        session_token: &str,
        window_size: Dimension,
        maximize: bool,
    ) -> Result<(), LifecycleError> {
        let parameters = ParameterStore::with_defaults(self.options.default_parameters.clone());
        let mut stub = HostStub::new(component, self.options.document_base.clone(), parameters);
        stub.set_parameter("username", username);
        stub.set_parameter("sessionid", session_token);
        // no browser chrome, so let the client show its own quit button
        stub.set_parameter("stand-alone", "true");

        self.window.set_size(window_size);
        self.window.center();
        if maximize {
            self.window.maximize();
        }
        self.window.validate();
        stub.attach_surface(self.window.surface());

        // the stub is kept even if bring-up fails so close can still tear it down
        let stub = self.stub.insert(stub);
        self.phase = HostPhase::Hosting;
        stub.init()?;
        stub.start()?;

        stub.set_visible(true);
        self.window.set_visible(true);
        info!("[Window] hosting started");
        Ok(())
    }

    /// Pumps window events until the window is closed.
    pub fn run(&mut self) -> HostPhase {
        while self.phase < HostPhase::Closing {
            match self.window.next_event() {
                Some(WindowEvent::Resized(size)) => {
                    if let Some(stub) = self.stub.as_mut() {
                        stub.resize_to(size);
                    }
                }
                Some(WindowEvent::CloseRequested) | None => self.on_window_close(),
            }
        }
        self.phase
    }

    /// Stops and destroys the component while the watchdog counts down, then
    /// exits. Safe to call more than once.
    pub fn on_window_close(&mut self) {
        if self.phase >= HostPhase::Closing {
            return;
        }
        self.phase = HostPhase::Closing;
        info!("[Window] close requested");

        if let Some(stub) = self.stub.as_mut() {
            let _countdown = self.watchdog.arm();
            if stub.is_active() {
                if let Err(e) = stub.stop() {
                    warn!("[Window] {}", e);
                }
            }
            if let Err(e) = stub.destroy() {
                warn!("[Window] {}", e);
            }
        }

        self.latch.exit_with(0, || info!("[Window] shutdown complete"));
        self.phase = HostPhase::Terminated;
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    pub fn stub(&self) -> Option<&HostStub> {
        self.stub.as_ref()
    }

    pub fn window(&self) -> &W {
        &self.window
    }
}
