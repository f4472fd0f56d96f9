//! # Runtime events emitted by the supervisor, hook composer, and collectors.
//!
//! [`EventKind`] classifies everything the runtime reports while driving one
//! proxy lifecycle: process events (spawn/exit), termination events
//! (interrupt, grace handling), hook failures, and subscriber-delivery
//! problems.
//!
//! The [`Event`] struct carries optional metadata (hook name, pid, exit
//! status, reason, filename) populated via `with_*` builders.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order across subscribers.
//!
//! ## Example
//! ```rust
//! use proxyvisor::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::HookFailed)
//!     .with_hook("admin-data-collector")
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::HookFailed);
//! assert_eq!(ev.hook.as_deref(), Some("admin-data-collector"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Process lifecycle ===
    /// The proxy binary is about to be spawned.
    ///
    /// Sets: `reason` (binary path), `at`, `seq`.
    ProcessSpawning,

    /// The proxy subprocess exists.
    ///
    /// Sets: `pid`, `at`, `seq`.
    ProcessSpawned,

    /// The proxy subprocess exited (voluntarily or after termination).
    ///
    /// Sets: `status`, `at`, `seq`.
    ProcessExited,

    // === Termination ===
    /// Termination was requested (OS signal, explicit API call, or child
    /// self-exit).
    ///
    /// Sets: `reason` (trigger source), `at`, `seq`.
    TerminateRequested,

    /// An interrupt was forwarded to the child; the grace period starts.
    ///
    /// Sets: `pid`, `at`, `seq`.
    InterruptSent,

    /// The child did not exit within the grace period and was force-killed.
    /// This is a warning, not a run failure.
    ///
    /// Sets: `pid`, `at`, `seq`.
    GraceExceeded,

    // === Hooks and collectors ===
    /// A post-start or shutdown hook failed; the run continues.
    ///
    /// Sets: `hook`, `reason` (phase and error), `at`, `seq`.
    HookFailed,

    /// A collector wrote a diagnostic file into the debug store.
    ///
    /// Sets: `hook`, `file`, `at`, `seq`.
    CollectorWrote,

    // === Subscriber delivery ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `hook` (subscriber name), `reason` (panic info), `at`, `seq`.
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `hook` (subscriber name), `reason` ("full"/"closed"), `at`, `seq`.
    SubscriberOverflow,
}

/// A single runtime event with optional metadata.
///
/// Construct with [`Event::now`] and attach metadata with the `with_*`
/// builders. Fields not relevant to a given [`EventKind`] stay `None`.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event classification.
    pub kind: EventKind,
    /// Wall-clock timestamp at construction.
    pub at: SystemTime,
    /// Globally monotonic sequence number.
    pub seq: u64,
    /// Hook or subscriber name, when the event concerns one.
    pub hook: Option<String>,
    /// Child process id, when known.
    pub pid: Option<u32>,
    /// Rendered exit status, for [`EventKind::ProcessExited`].
    pub status: Option<String>,
    /// Free-form detail: trigger source, error message, binary path.
    pub reason: Option<String>,
    /// Debug-store filename, for [`EventKind::CollectorWrote`].
    pub file: Option<String>,
}

impl Event {
    /// Creates an event stamped with the current time and the next sequence
    /// number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            kind,
            at: SystemTime::now(),
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            hook: None,
            pid: None,
            status: None,
            reason: None,
            file: None,
        }
    }

    /// Attaches a hook (or subscriber) name.
    pub fn with_hook(mut self, name: impl Into<String>) -> Self {
        self.hook = Some(name.into());
        self
    }

    /// Attaches the child process id.
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches a rendered exit status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Attaches a free-form reason string.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a debug-store filename.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Shorthand for the event published when a subscriber panics.
    pub fn subscriber_panicked(name: &str, info: impl Into<String>) -> Self {
        Self::now(EventKind::SubscriberPanicked)
            .with_hook(name)
            .with_reason(info)
    }

    /// Shorthand for the event published when a subscriber drops an event.
    pub fn subscriber_overflow(name: &str, why: &'static str) -> Self {
        Self::now(EventKind::SubscriberOverflow)
            .with_hook(name)
            .with_reason(why)
    }
}
