//! # Lifecycle hook trait and run context.
//!
//! A [`Hook`] is a named extension unit contributing to one or more
//! lifecycle phases. All three methods default to no-ops, so a hook
//! implements only the slots it cares about:
//!
//! - `pre_start` — mutate the [`RuntimeConfig`] before the bootstrap is
//!   rendered (e.g. point it at a control-plane address). Failures here are
//!   fatal: the subprocess is never spawned.
//! - `post_start` — act on the live run (e.g. spawn a collector task
//!   scoped to the run's cancellation token). Failures are logged, the run
//!   continues.
//! - `shutdown` — harvest diagnostics into the debug store. Failures are
//!   logged; later hooks still run.
//!
//! Hooks are applied strictly in registration order for **all** phases
//! (never reversed), so a hook added later may assume an earlier hook's
//! setup already ran.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::admin::AdminClient;
use crate::config::RuntimeConfig;
use crate::error::HookError;
use crate::events::Bus;
use crate::store::DebugStore;

/// Everything a post-start or shutdown hook may touch.
///
/// Cheap to clone except for the shared store; safe to hand to spawned
/// collector tasks.
#[derive(Clone)]
pub struct RunContext {
    /// Client for the proxy admin endpoint (may be disabled).
    pub admin: AdminClient,
    /// Per-run diagnostics directory.
    pub store: Arc<DebugStore>,
    /// Cancelled when the runtime transitions to Terminating; collector
    /// tasks must observe it and exit promptly.
    pub token: CancellationToken,
    /// Child pid; `None` when the subprocess never spawned.
    pub pid: Option<u32>,
    /// Event bus for collector observability.
    pub bus: Bus,
}

/// A named, ordered lifecycle extension unit.
#[async_trait]
pub trait Hook: Send + Sync + 'static {
    /// Returns a stable, human-readable hook name (used in events).
    fn name(&self) -> &str;

    /// Mutates the configuration before the bootstrap is rendered.
    ///
    /// An error aborts the run; the subprocess is never spawned.
    async fn pre_start(&self, _cfg: &mut RuntimeConfig) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs after the subprocess handle exists, concurrent with the proxy's
    /// own startup. Hooks needing admin readiness must poll for it.
    async fn post_start(&self, _ctx: &RunContext) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs once termination has been dispatched to the subprocess; may
    /// race against the child's exit, so admin fetch failures here are
    /// expected and must stay soft.
    async fn shutdown(&self, _ctx: &RunContext) -> Result<(), HookError> {
        Ok(())
    }
}
