//! Hosting side: the component contract, its parameters and the host stub.

pub mod component;
pub mod parameters;
pub mod stub;

pub use component::{Dimension, HostedComponent, RawSurface, Surface};
pub use parameters::{ParameterFallback, ParameterStore};
pub use stub::{HostStub, LifecycleError, LifecycleState, StubHandle};
