//! Window backend for targets without a supported native toolkit.
//!
//! There is no surface to embed; the component renders on its own. A close
//! request is Ctrl-C or SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info};
use parking_lot::{Condvar, Mutex};

use crate::host::{Dimension, RawSurface, Surface};

use super::{NativeWindow, WindowEvent, WindowFactory};

#[derive(Debug, Default)]
struct CloseSignal {
    requested: Mutex<bool>,
    cvar: Condvar,
}

impl CloseSignal {
    fn request(&self) {
        *self.requested.lock() = true;
        self.cvar.notify_all();
    }

    fn wait(&self) {
        let mut requested = self.requested.lock();
        while !*requested {
            self.cvar.wait(&mut requested);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessWindowFactory;

impl WindowFactory for HeadlessWindowFactory {
    type Window = HeadlessWindow;

    fn create(&self, title: &str, size: Dimension) -> Result<HeadlessWindow> {
        let close = Arc::new(CloseSignal::default());
        let handler_close = Arc::clone(&close);
        ctrlc::set_handler(move || handler_close.request())
            .context("installing the close signal handler")?;
        info!("[Window] headless window `{}` ({}×{}), Ctrl-C closes", title, size.width, size.height);
        Ok(HeadlessWindow { size, visible: false, closed: false, close })
    }
}

#[derive(Debug)]
pub struct HeadlessWindow {
    size: Dimension,
    visible: bool,
    closed: bool,
    close: Arc<CloseSignal>,
}

impl NativeWindow for HeadlessWindow {
    fn set_size(&mut self, size: Dimension) {
        self.size = size;
    }

    fn center(&mut self) {}

    fn maximize(&mut self) {
        debug!("[Window] no display to maximize on, keeping {}×{}", self.size.width, self.size.height);
    }

    fn validate(&mut self) {}

    fn surface(&self) -> Surface {
        Surface { handle: RawSurface::default(), width: self.size.width, height: self.size.height }
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn next_event(&mut self) -> Option<WindowEvent> {
        if self.closed {
            return None;
        }
        self.close.wait();
        self.closed = true;
        Some(WindowEvent::CloseRequested)
    }
}
