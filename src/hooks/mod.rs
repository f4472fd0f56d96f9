//! Lifecycle hooks: the trait, the ordered composer, and built-in hooks.

mod collectors;
mod controlplane;
mod hook;
mod set;

pub use collectors::AdminDataCollector;
pub use controlplane::ControlPlaneBootstrap;
pub use hook::{Hook, RunContext};
pub use set::HookSet;
