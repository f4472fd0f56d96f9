//! Subprocess spawning, handles, and the two-phase termination protocol.

mod handle;
mod supervisor;

pub use handle::{ChildHandle, ExitStatus, ProcessHandle};
pub use supervisor::{terminate_with_grace, EnvoySpawner, Spawn, TerminationOutcome};
