//! Error types used by the proxy runtime and its hooks.
//!
//! This module defines the error split the runtime lives by:
//!
//! - [`RuntimeError`] — fatal errors that abort the run and become the
//!   definitive failure reason returned to the caller.
//! - [`HookError`] — errors raised by lifecycle hooks; fatal only during
//!   the pre-start phase, otherwise published to the bus and logged.
//! - [`AdminError`] — failures talking to the proxy admin endpoint; always
//!   soft (recorded as missing diagnostic data, never a run failure).
//! - [`StoreError`] — debug-store I/O failures.
//!
//! `RuntimeError` provides `as_label`/`as_message` helpers for
//! logging/metrics.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::process::ExitStatus;

/// # Fatal errors produced by the runtime.
///
/// Any of these aborts the run; non-fatal conditions (forced kill, hook
/// failures after start, admin fetch failures) are events, not errors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The configuration failed validation before spawn.
    #[error("invalid runtime configuration: {reason}")]
    InvalidConfig {
        /// Human-readable validation failure.
        reason: String,
    },

    /// The proxy binary could not be spawned. No subprocess exists;
    /// shutdown hooks still run against the (empty) debug store.
    #[error("failed to spawn {binary:?}: {source}")]
    Spawn {
        /// Path of the binary that failed to start.
        binary: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A pre-start hook failed; the subprocess was never spawned.
    #[error("pre-start hook {hook:?} failed: {source}")]
    PreStartHook {
        /// Name of the failing hook.
        hook: String,
        /// The hook's error.
        #[source]
        source: HookError,
    },

    /// The subprocess exited on its own before any termination request.
    #[error("proxy exited unexpectedly: {status}")]
    ProcessFailed {
        /// The child's final exit status.
        status: ExitStatus,
    },

    /// `run()` was called on a runtime that already ran; a runtime drives
    /// exactly one subprocess lifecycle.
    #[error("runtime already ran; construct a new one per run")]
    AlreadyRan,

    /// Debug-store creation or bootstrap write failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidConfig { .. } => "runtime_invalid_config",
            RuntimeError::Spawn { .. } => "runtime_spawn_failed",
            RuntimeError::PreStartHook { .. } => "runtime_pre_start_hook_failed",
            RuntimeError::ProcessFailed { .. } => "runtime_process_failed",
            RuntimeError::AlreadyRan => "runtime_already_ran",
            RuntimeError::Store(_) => "runtime_store_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Errors raised by lifecycle hooks.
///
/// During pre-start the first `HookError` aborts the run (wrapped in
/// [`RuntimeError::PreStartHook`]); during post-start and shutdown it is
/// published as `EventKind::HookFailed` and remaining hooks still run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HookError {
    /// Hook-specific failure with a free-form message.
    #[error("{message}")]
    Failed {
        /// What went wrong, from the hook's point of view.
        message: String,
    },

    /// The admin endpoint could not be queried.
    #[error(transparent)]
    Admin(#[from] AdminError),

    /// A debug-store write failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Other I/O raised by the hook.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HookError {
    /// Convenience constructor for message-only failures.
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed {
            message: message.into(),
        }
    }
}

/// # Errors talking to the proxy admin endpoint.
///
/// Always soft: a failed fetch yields missing diagnostic data, never a run
/// failure. No retries are performed.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AdminError {
    /// The admin interface was disabled in the configuration.
    #[error("admin interface is disabled")]
    Disabled,

    /// Transport-level failure (connection refused, reset, timeout).
    #[error("admin request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("admin endpoint {path} answered {status}")]
    Status {
        /// Requested admin path.
        path: String,
        /// HTTP status code received.
        status: u16,
    },
}

/// # Debug-store I/O errors.
#[derive(Error, Debug)]
#[error("debug store {path:?}: {source}")]
pub struct StoreError {
    /// Path of the store or file involved.
    pub path: PathBuf,
    /// Underlying OS error.
    #[source]
    pub source: io::Error,
}
