//! Runtime façade and OS signal handling.

mod runtime;
pub(crate) mod shutdown;

pub use runtime::{RunOutcome, Runtime, State};
