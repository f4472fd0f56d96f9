//! # proxyvisor
//!
//! **Proxyvisor** manages the lifecycle of an externally-distributed Envoy
//! binary on behalf of a CLI: it renders a bootstrap configuration, spawns
//! the proxy as a supervised subprocess, applies an ordered set of
//! lifecycle hooks, and terminates the proxy cleanly while preserving
//! diagnostic artifacts in a per-run debug store.
//!
//! ## Architecture
//! ```text
//!     RuntimeConfig + Vec<Arc<dyn Hook>> + Vec<Arc<dyn Subscribe>>
//!                              │
//!                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Runtime (lifecycle façade)                                       │
//! │  - HookSet (ordered pre-start / post-start / shutdown slots)      │
//! │  - DebugStore (per-run diagnostics directory, created eagerly)    │
//! │  - Bus (broadcast events) → SubscriberSet (fan-out)               │
//! │  - CancellationToken (run-scoped; collectors are child tokens)    │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        ▼
//! ┌──────────────────┐   spawn / interrupt / grace wait / kill
//! │ Process          │ ◄─────────────────────────────────────────┐
//! │ supervisor       │                                           │
//! └──────┬───────────┘     ┌─────────────────┐                   │
//!        │ child           │ AdminClient     │  GET /server_info │
//!        ▼                 │ (127.0.0.1:port)│  GET /clusters    │
//!   envoy -c bootstrap.json└─────────────────┘  GET /stats       │
//!        │                        ▲                              │
//!        └── admin listener ──────┘        shutdown hooks ───────┘
//! ```
//!
//! ## Lifecycle
//! `run()` applies pre-start hooks (mutating the configuration), renders
//! the bootstrap, spawns the subprocess, applies post-start hooks, then
//! blocks until the process exits, an OS termination signal arrives, or
//! [`Runtime::terminate`] is called — whichever comes first. Termination is
//! two-phase: an interrupt is forwarded to the child, and only after the
//! grace period expires is it force-killed. Shutdown hooks always run,
//! concurrently with the grace wait.
//!
//! ## Error policy
//! Fatal: invalid configuration, spawn failure, a failing pre-start hook,
//! and the child exiting on its own. Everything else — post-start/shutdown
//! hook failures, admin fetch gaps, a forced kill — is reported as events
//! and inside the debug store, never as a run failure.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use proxyvisor::{AdminDataCollector, Hook, Runtime, RuntimeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = RuntimeConfig::new("/opt/envoy/1.18.3/bin/envoy");
//!     cfg.admin_port = 15000;
//!
//!     let hooks: Vec<Arc<dyn Hook>> = vec![Arc::new(AdminDataCollector::new())];
//!     let runtime = Runtime::new(cfg, hooks, Vec::new())?;
//!
//!     let outcome = runtime.run().await?;
//!     println!("proxy exited: {} (forced: {})", outcome.status, outcome.forced);
//!     Ok(())
//! }
//! ```

mod admin;
mod binary;
mod bootstrap;
mod config;
mod core;
mod error;
mod events;
mod hooks;
mod process;
mod store;
mod subscribers;

// ---- Public re-exports ----

pub use admin::AdminClient;
pub use binary::{BinaryResolver, InstalledBinary, ResolveError};
pub use bootstrap::render as render_bootstrap;
pub use config::{Mode, RuntimeConfig};
pub use core::{RunOutcome, Runtime, State};
pub use error::{AdminError, HookError, RuntimeError, StoreError};
pub use events::{Bus, Event, EventKind};
pub use hooks::{AdminDataCollector, ControlPlaneBootstrap, Hook, HookSet, RunContext};
pub use process::{
    terminate_with_grace, ChildHandle, EnvoySpawner, ExitStatus, ProcessHandle, Spawn,
    TerminationOutcome,
};
pub use store::{
    DebugStore, BOOTSTRAP_FILE, CLUSTERS_FILE, SERVER_INFO_FILE, STATS_FILE,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
