//! Substitute for the browser host the component expects to be embedded in.
//!
//! The stub has no behaviour of its own: it keeps the parameters, tracks the
//! lifecycle state and forwards everything else to the wrapped component.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use log::{debug, info};
use thiserror::Error;

use super::{
    component::{Dimension, HostedComponent, Surface},
    parameters::ParameterStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initialized,
    Active,
    Stopped,
    Destroyed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("`{op}` is not allowed while the component is {from:?}")]
    InvalidTransition { op: &'static str, from: LifecycleState },
}

/// State shared between the stub and the handle given to the component.
struct StubShared {
    parameters: RefCell<ParameterStore>,
    active: Cell<bool>,
    document_base: String,
    code_base: Option<String>,
    surface: Cell<Option<Surface>>,
    pending_resize: Cell<Option<Dimension>>,
}

/// The host as seen from inside the component.
#[derive(Clone)]
pub struct StubHandle {
    shared: Rc<StubShared>,
}

impl StubHandle {
    /// Never fails: unknown names resolve through the fallback or to `None`.
    pub fn parameter(&self, name: &str) -> Option<String> {
        self.shared.parameters.borrow().get(name)
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.get()
    }

    pub fn document_base(&self) -> &str {
        &self.shared.document_base
    }

    pub fn code_base(&self) -> Option<&str> {
        self.shared.code_base.as_deref()
    }

    /// The surface attached by the window, once laid out.
    pub fn surface(&self) -> Option<Surface> {
        self.shared.surface.get()
    }

    /// Asks the host to resize the component. Delivered to
    /// [`HostedComponent::resize`] once the current call has returned.
    pub fn request_resize(&self, width: i32, height: i32) {
        self.shared.pending_resize.set(Some(Dimension::new(width, height)));
    }
}

impl fmt::Debug for StubHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubHandle")
            .field("active", &self.shared.active.get())
            .field("document_base", &self.shared.document_base)
            .finish()
    }
}

pub struct HostStub {
    component: Box<dyn HostedComponent>,
    shared: Rc<StubShared>,
    state: LifecycleState,
    visible: bool,
}

impl HostStub {
    /// Wraps `component` and installs the stub as its host.
    pub fn new(
        mut component: Box<dyn HostedComponent>,
        document_base: impl Into<String>,
        parameters: ParameterStore,
    ) -> Self {
        let shared = Rc::new(StubShared {
            parameters: RefCell::new(parameters),
            active: Cell::new(false),
            document_base: document_base.into(),
            code_base: component.code_base(),
            surface: Cell::new(None),
            pending_resize: Cell::new(None),
        });
        component.set_stub(StubHandle { shared: Rc::clone(&shared) });
        Self { component, shared, state: LifecycleState::Created, visible: false }
    }

    pub fn set_parameter(&self, name: &str, value: &str) {
        debug!("[HostStub] parameter `{}` set", name);
        self.shared.parameters.borrow_mut().set(name, value);
    }

    pub fn parameter(&self, name: &str) -> Option<String> {
        self.shared.parameters.borrow().get(name)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// True strictly between a successful `start` and the next `stop`.
    pub fn is_active(&self) -> bool {
        self.shared.active.get()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn document_base(&self) -> &str {
        &self.shared.document_base
    }

    pub fn code_base(&self) -> Option<String> {
        self.component.code_base()
    }

    /// Records the surface the window laid out for the component.
    pub fn attach_surface(&mut self, surface: Surface) {
        debug!("[HostStub] surface attached ({}×{})", surface.width, surface.height);
        self.shared.surface.set(Some(surface));
    }

    pub fn init(&mut self) -> Result<(), LifecycleError> {
        self.transition("init", &[LifecycleState::Created])?;
        info!("[HostStub] init");
        self.component.init();
        self.state = LifecycleState::Initialized;
        self.flush_resize_request();
        Ok(())
    }

    /// Stop ends the supervised session, so a stopped component is never restarted.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        self.transition("start", &[LifecycleState::Initialized])?;
        info!("[HostStub] start");
        self.component.start();
        self.state = LifecycleState::Active;
        self.shared.active.set(true);
        self.flush_resize_request();
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        self.transition("stop", &[LifecycleState::Active])?;
        info!("[HostStub] stop");
        self.component.stop();
        self.state = LifecycleState::Stopped;
        self.shared.active.set(false);
        Ok(())
    }

    pub fn destroy(&mut self) -> Result<(), LifecycleError> {
        self.transition("destroy", &[LifecycleState::Stopped, LifecycleState::Initialized])?;
        info!("[HostStub] destroy");
        self.component.destroy();
        self.state = LifecycleState::Destroyed;
        Ok(())
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.component.resize(width, height);
        self.flush_resize_request();
    }

    pub fn resize_to(&mut self, size: Dimension) {
        self.resize(size.width, size.height);
    }

    /// Both the stub and the component must agree on visibility.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.component.set_visible(visible);
    }

    fn transition(
        &self,
        op: &'static str,
        allowed: &[LifecycleState],
    ) -> Result<(), LifecycleError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition { op, from: self.state })
        }
    }

    fn flush_resize_request(&mut self) {
        if let Some(size) = self.shared.pending_resize.take() {
            debug!("[HostStub] forwarding resize request {}×{}", size.width, size.height);
            self.component.resize(size.width, size.height);
        }
    }
}

impl fmt::Debug for HostStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostStub")
            .field("state", &self.state)
            .field("visible", &self.visible)
            .field("parameters", &*self.shared.parameters.borrow())
            .finish()
    }
}
