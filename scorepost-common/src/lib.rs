pub mod address;
pub mod logging;

pub use tracing;

/// Lifecycle signals broadcast by the controller to long running tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
