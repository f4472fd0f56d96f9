//! # Runtime: one supervised proxy lifecycle.
//!
//! [`Runtime`] wires the pieces together — configuration, ordered hooks,
//! process supervisor, admin client, debug store, event bus — and exposes
//! `run`/`terminate` to the CLI layer.
//!
//! ## State machine
//! ```text
//! Constructed → Configuring → Starting → Running → Terminating → Terminated
//!                   │             │          │
//!                   │             │          ├─ OS signal ─────────┐
//!                   │             │          ├─ terminate() ───────┤
//!                   │             │          └─ child self-exit ───┤
//!                   │             │                                ▼
//!                   │             └─ spawn error ──────────► shutdown hooks
//!                   └─ pre-start hook error / invalid config ──► Terminated
//! ```
//!
//! ## Rules
//! - Exactly one subprocess lifecycle per runtime; a second `run()` returns
//!   [`RuntimeError::AlreadyRan`].
//! - Pre-start hooks complete fully before the subprocess is spawned.
//! - Post-start hooks run once the handle exists, concurrent with the
//!   proxy's own startup (no readiness guarantee).
//! - Shutdown hooks always run once termination has been dispatched —
//!   whatever triggered it, spawn failure included — and run concurrently
//!   with the grace-period wait.
//! - The debug store exists from construction; it is removed after a clean
//!   run unless retention was requested, and always kept on failures.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::admin::AdminClient;
use crate::bootstrap;
use crate::config::RuntimeConfig;
use crate::core::shutdown;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::hooks::{Hook, HookSet, RunContext};
use crate::process::{terminate_with_grace, EnvoySpawner, ExitStatus, Spawn};
use crate::store::DebugStore;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Event bus ring capacity; plenty for one lifecycle's worth of events.
const BUS_CAPACITY: usize = 256;

/// Lifecycle states of a [`Runtime`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    /// Built, not yet running.
    Constructed = 0,
    /// Pre-start hooks are mutating the configuration.
    Configuring = 1,
    /// Bootstrap rendered; subprocess being spawned.
    Starting = 2,
    /// Subprocess exists and has not exited.
    Running = 3,
    /// Termination dispatched; shutdown hooks and grace wait in flight.
    Terminating = 4,
    /// Final state; subprocess gone, shutdown hooks done.
    Terminated = 5,
}

impl State {
    fn from_u8(v: u8) -> State {
        match v {
            0 => State::Constructed,
            1 => State::Configuring,
            2 => State::Starting,
            3 => State::Running,
            4 => State::Terminating,
            _ => State::Terminated,
        }
    }
}

/// What `run()` returns when the run itself did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    /// Final exit status of the subprocess.
    pub status: ExitStatus,
    /// Whether the grace period expired and the child was force-killed.
    /// A warning, not a failure.
    pub forced: bool,
}

/// What decided the termination race.
enum Decided {
    ChildExited(ExitStatus),
    Api,
    Signal,
}

/// Running subscriber fan-out, stopped and drained before `run()` returns.
struct Listener {
    stop: CancellationToken,
    worker: JoinHandle<()>,
}

/// Façade over one supervised proxy lifecycle.
pub struct Runtime {
    config: Mutex<Option<RuntimeConfig>>,
    hooks: HookSet,
    subscribers: Mutex<Vec<Arc<dyn Subscribe>>>,
    listener: Mutex<Option<Listener>>,
    bus: Bus,
    store: Arc<DebugStore>,
    spawner: Box<dyn Spawn>,
    /// Cancelled by `terminate()` (or kept for symmetry with OS signals).
    trigger: CancellationToken,
    /// Lifetime token for hook-spawned collector tasks.
    run_token: CancellationToken,
    state: AtomicU8,
}

impl Runtime {
    /// Creates a runtime for one run.
    ///
    /// The debug store directory is created here, eagerly, so shutdown
    /// hooks can write partial diagnostics even if the subprocess never
    /// starts.
    pub fn new(
        config: RuntimeConfig,
        hooks: Vec<Arc<dyn Hook>>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Result<Self, RuntimeError> {
        let store = DebugStore::create(&config.debug_base_dir)?;
        Ok(Self {
            config: Mutex::new(Some(config)),
            hooks: HookSet::new(hooks),
            subscribers: Mutex::new(subscribers),
            listener: Mutex::new(None),
            bus: Bus::new(BUS_CAPACITY),
            store: Arc::new(store),
            spawner: Box::new(EnvoySpawner),
            trigger: CancellationToken::new(),
            run_token: CancellationToken::new(),
            state: AtomicU8::new(State::Constructed as u8),
        })
    }

    /// Replaces the process spawner (test seam for fake process handles).
    pub fn with_spawner(mut self, spawner: Box<dyn Spawn>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Path of the per-run debug store.
    pub fn debug_store(&self) -> &Path {
        self.store.path()
    }

    /// Subscribes to the runtime's event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Requests termination of the running proxy.
    ///
    /// Idempotent: calling it again, or after the runtime reached
    /// [`State::Terminated`], is a no-op and never re-runs shutdown hooks.
    pub fn terminate(&self) {
        if self.state() == State::Terminated {
            return;
        }
        self.trigger.cancel();
    }

    /// Drives the full lifecycle and blocks until [`State::Terminated`].
    ///
    /// Fatal conditions ([`RuntimeError`]) abort the run and are the
    /// definitive failure reason; everything non-fatal (hook failures after
    /// start, admin fetch gaps, forced kill) surfaces as events and inside
    /// the debug store only.
    pub async fn run(&self) -> Result<RunOutcome, RuntimeError> {
        let result = self.drive().await;
        // Everything published during the run reaches the subscribers
        // before the caller regains control.
        self.flush_subscribers().await;
        result
    }

    async fn drive(&self) -> Result<RunOutcome, RuntimeError> {
        let mut cfg = self
            .config
            .lock()
            .unwrap()
            .take()
            .ok_or(RuntimeError::AlreadyRan)?;

        self.start_subscriber_listener();
        self.set_state(State::Configuring);

        // Pre-start phase: fail-fast, nothing was spawned yet.
        if let Err((hook, source)) = self.hooks.apply_pre_start(&mut cfg).await {
            self.set_state(State::Terminated);
            return Err(RuntimeError::PreStartHook { hook, source });
        }

        // The configuration must be fully resolved before spawn.
        if let Err(reason) = cfg.validate() {
            self.set_state(State::Terminated);
            return Err(RuntimeError::InvalidConfig { reason });
        }

        self.set_state(State::Starting);
        let bootstrap_path = match bootstrap::write(&self.store, &cfg).await {
            Ok(p) => p,
            Err(e) => {
                self.set_state(State::Terminated);
                return Err(e.into());
            }
        };

        let admin = if cfg.admin_disabled {
            AdminClient::disabled()
        } else {
            AdminClient::new(cfg.bind_address(), cfg.admin_port)
        };
        let mut ctx = RunContext {
            admin,
            store: Arc::clone(&self.store),
            token: self.run_token.clone(),
            pid: None,
            bus: self.bus.clone(),
        };

        self.bus.publish(
            Event::now(EventKind::ProcessSpawning)
                .with_reason(cfg.binary_path.display().to_string()),
        );

        let mut handle = match self.spawner.spawn(&cfg, &bootstrap_path).await {
            Ok(h) => h,
            Err(source) => {
                // No subprocess exists; shutdown hooks still get their
                // chance against the (empty) debug store.
                self.set_state(State::Terminating);
                self.run_token.cancel();
                self.hooks.apply_shutdown(&ctx, &self.bus).await;
                self.set_state(State::Terminated);
                return Err(RuntimeError::Spawn {
                    binary: cfg.binary_path.clone(),
                    source,
                });
            }
        };

        ctx.pid = handle.id();
        let mut spawned = Event::now(EventKind::ProcessSpawned);
        if let Some(pid) = ctx.pid {
            spawned = spawned.with_pid(pid);
        }
        self.bus.publish(spawned);
        self.set_state(State::Running);

        // Post-start phase: best-effort, concurrent with proxy startup.
        self.hooks.apply_post_start(&ctx, &self.bus).await;

        // The termination race: whichever branch wins, the losers are
        // abandoned without side effects.
        let decided = tokio::select! {
            status = handle.wait() => {
                Decided::ChildExited(status.unwrap_or(ExitStatus::Unknown))
            }
            _ = self.trigger.cancelled() => Decided::Api,
            _ = shutdown::wait_for_shutdown_signal() => Decided::Signal,
        };

        self.set_state(State::Terminating);
        self.run_token.cancel();
        // A self-exit observed while terminate() was already pending is a
        // requested termination that won the race by a poll.
        let requested = self.trigger.is_cancelled();
        let source = match &decided {
            Decided::ChildExited(_) if requested => "api",
            Decided::ChildExited(_) => "child-exit",
            Decided::Api => "api",
            Decided::Signal => "signal",
        };
        self.bus
            .publish(Event::now(EventKind::TerminateRequested).with_reason(source));

        match decided {
            Decided::ChildExited(status) => {
                // Self-exit before any termination request is a run
                // failure; a tie with a pending request counts as the
                // request. Diagnostics are collected either way.
                self.bus.publish(
                    Event::now(EventKind::ProcessExited).with_status(status.to_string()),
                );
                self.hooks.apply_shutdown(&ctx, &self.bus).await;
                self.set_state(State::Terminated);
                if requested {
                    if !cfg.retain_debug_store {
                        let _ = self.store.remove();
                    }
                    return Ok(RunOutcome {
                        status,
                        forced: false,
                    });
                }
                Err(RuntimeError::ProcessFailed { status })
            }
            Decided::Api | Decided::Signal => {
                // Shutdown hooks run concurrently with the grace wait;
                // admin fetches may race the child's exit, which is fine.
                let (outcome, ()) = tokio::join!(
                    terminate_with_grace(&mut handle, cfg.grace, &self.bus),
                    self.hooks.apply_shutdown(&ctx, &self.bus),
                );
                self.bus.publish(
                    Event::now(EventKind::ProcessExited).with_status(outcome.status.to_string()),
                );
                self.set_state(State::Terminated);

                if !cfg.retain_debug_store {
                    let _ = self.store.remove();
                }
                Ok(RunOutcome {
                    status: outcome.status,
                    forced: outcome.forced,
                })
            }
        }
    }

    /// Forwards bus events to the subscriber set until flushed.
    fn start_subscriber_listener(&self) {
        let subs = std::mem::take(&mut *self.subscribers.lock().unwrap());
        if subs.is_empty() {
            return;
        }
        let set = SubscriberSet::new(subs, self.bus.clone());
        let mut rx = self.bus.subscribe();
        let stop = CancellationToken::new();
        let stopped = stop.clone();

        let worker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stopped.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            // Events still sitting in the ring are delivered before the
            // subscriber queues close.
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            set.shutdown().await;
        });
        *self.listener.lock().unwrap() = Some(Listener { stop, worker });
    }

    /// Stops the listener and waits until every queued event was handed to
    /// its subscriber.
    async fn flush_subscribers(&self) {
        let listener = self.listener.lock().unwrap().take();
        if let Some(listener) = listener {
            listener.stop.cancel();
            let _ = listener.worker.await;
        }
    }

    fn set_state(&self, state: State) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_roundtrip() {
        for s in [
            State::Constructed,
            State::Configuring,
            State::Starting,
            State::Running,
            State::Terminating,
            State::Terminated,
        ] {
            assert_eq!(State::from_u8(s as u8), s);
        }
    }
}
