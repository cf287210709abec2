//! The fixed contract every hosted component is driven through.

use super::stub::StubHandle;

/// Raw handle of a native rendering surface (an `HWND` on Windows).
/// Zero means the backend has no native surface to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSurface(pub isize);

/// A rendering surface the component may draw into, with its laid-out size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub handle: RawSurface,
    pub width: i32,
    pub height: i32,
}

/// Opaque third-party entry component.
///
/// The host never looks inside; it only calls these methods, always from the
/// UI thread. Any of the lifecycle calls may block for an unbounded time.
pub trait HostedComponent {
    /// Hands the component the host it should query for parameters and placement.
    fn set_stub(&mut self, stub: StubHandle);

    fn init(&mut self);
    fn start(&mut self);
    fn stop(&mut self);
    fn destroy(&mut self);

    /// Sizing requests are forwarded verbatim; the component owns all
    /// rendering-surface decisions.
    fn resize(&mut self, width: i32, height: i32);

    fn set_visible(&mut self, visible: bool);

    /// Location the component was loaded from, if it resolves one itself.
    fn code_base(&self) -> Option<String>;
}

/// Width/height pair used for window and component sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub width: i32,
    pub height: i32,
}

impl Dimension {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}
