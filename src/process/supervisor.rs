//! # Process supervisor: spawn and two-phase termination.
//!
//! Spawning assembles the child's argument list from the configuration and
//! the rendered bootstrap path, inherits our stdio (so proxy failures are
//! visible immediately), and inherits the environment.
//!
//! ## Termination protocol
//! ```text
//! terminate trigger
//!     └─► interrupt(child)                 (SIGINT; proxy drains connections)
//!           └─► wait up to grace ──► exited voluntarily → done
//!                        └─► timeout ──► kill(child) → GraceExceeded warning
//! ```
//! The forced kill is an accepted fallback, reported as a warning event,
//! never a run failure. No retries happen at this layer.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::config::RuntimeConfig;
use crate::events::{Bus, Event, EventKind};
use crate::process::handle::{ChildHandle, ExitStatus, ProcessHandle};

/// Spawns the proxy subprocess for a fully-resolved configuration.
///
/// The production implementation launches the real binary; tests inject a
/// fake returning a scripted [`ProcessHandle`].
#[async_trait]
pub trait Spawn: Send + Sync {
    /// Spawns the child and returns its handle.
    async fn spawn(
        &self,
        cfg: &RuntimeConfig,
        bootstrap_path: &Path,
    ) -> io::Result<Box<dyn ProcessHandle>>;
}

/// Default spawner backed by [`tokio::process::Command`].
#[derive(Default)]
pub struct EnvoySpawner;

#[async_trait]
impl Spawn for EnvoySpawner {
    async fn spawn(
        &self,
        cfg: &RuntimeConfig,
        bootstrap_path: &Path,
    ) -> io::Result<Box<dyn ProcessHandle>> {
        let mut cmd = Command::new(&cfg.binary_path);
        cmd.arg("-c").arg(bootstrap_path);
        // Distinct shared-memory region per concurrent proxy; the admin
        // port is already unique per instance.
        cmd.arg("--base-id").arg(cfg.admin_port.to_string());
        if !cfg.admin_disabled {
            cmd.arg("--admin-address-path")
                .arg(bootstrap_path.with_file_name("admin-address.txt"));
        }
        if let Some(dir) = &cfg.working_dir {
            cmd.current_dir(dir);
        }
        // Stdio is inherited by default: the proxy's own output goes to the
        // supervisor's streams. The child must not outlive an aborted parent.
        cmd.kill_on_drop(true);
        let child = cmd.spawn()?;
        Ok(Box::new(ChildHandle::new(child)))
    }
}

/// Outcome of the two-phase termination protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerminationOutcome {
    /// Final exit status of the child.
    pub status: ExitStatus,
    /// Whether the grace period expired and the child was force-killed.
    pub forced: bool,
}

/// Interrupts the child, waits up to `grace`, and force-kills on timeout.
///
/// Publishes [`EventKind::InterruptSent`] when the interrupt is delivered
/// and [`EventKind::GraceExceeded`] if the kill escalation fires. Errors
/// delivering the interrupt (e.g. the child already exited) degrade to
/// waiting; the child's exit is still collected.
pub async fn terminate_with_grace(
    handle: &mut Box<dyn ProcessHandle>,
    grace: Duration,
    bus: &Bus,
) -> TerminationOutcome {
    let pid = handle.id();

    if handle.interrupt().is_ok() {
        let mut ev = Event::now(EventKind::InterruptSent);
        if let Some(pid) = pid {
            ev = ev.with_pid(pid);
        }
        bus.publish(ev);
    }

    match tokio::time::timeout(grace, handle.wait()).await {
        Ok(status) => TerminationOutcome {
            status: status.unwrap_or(ExitStatus::Unknown),
            forced: false,
        },
        Err(_elapsed) => {
            let mut ev = Event::now(EventKind::GraceExceeded);
            if let Some(pid) = pid {
                ev = ev.with_pid(pid);
            }
            bus.publish(ev);

            let _ = handle.kill().await;
            let status = handle.wait().await.unwrap_or(ExitStatus::Unknown);
            TerminationOutcome {
                status,
                forced: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    /// Fake handle that exits only once interrupted or killed.
    struct Scripted {
        interrupted: Arc<AtomicBool>,
        killed: Arc<AtomicBool>,
        exit_on_interrupt: bool,
        exited: CancellationToken,
    }

    impl Scripted {
        fn stubborn() -> (Self, Arc<AtomicBool>, Arc<AtomicBool>) {
            let interrupted = Arc::new(AtomicBool::new(false));
            let killed = Arc::new(AtomicBool::new(false));
            let s = Self {
                interrupted: interrupted.clone(),
                killed: killed.clone(),
                exit_on_interrupt: false,
                exited: CancellationToken::new(),
            };
            (s, interrupted, killed)
        }

        fn polite() -> (Self, Arc<AtomicBool>, Arc<AtomicBool>) {
            let interrupted = Arc::new(AtomicBool::new(false));
            let killed = Arc::new(AtomicBool::new(false));
            let s = Self {
                interrupted: interrupted.clone(),
                killed: killed.clone(),
                exit_on_interrupt: true,
                exited: CancellationToken::new(),
            };
            (s, interrupted, killed)
        }
    }

    #[async_trait]
    impl ProcessHandle for Scripted {
        fn id(&self) -> Option<u32> {
            Some(7)
        }

        async fn wait(&mut self) -> io::Result<ExitStatus> {
            self.exited.cancelled().await;
            if self.killed.load(Ordering::SeqCst) {
                Ok(ExitStatus::Signaled(9))
            } else {
                Ok(ExitStatus::Exited(0))
            }
        }

        fn interrupt(&mut self) -> io::Result<()> {
            self.interrupted.store(true, Ordering::SeqCst);
            if self.exit_on_interrupt {
                self.exited.cancel();
            }
            Ok(())
        }

        async fn kill(&mut self) -> io::Result<()> {
            self.killed.store(true, Ordering::SeqCst);
            self.exited.cancel();
            Ok(())
        }
    }

    #[tokio::test]
    async fn polite_child_exits_within_grace() {
        let bus = Bus::new(16);
        let (fake, interrupted, killed) = Scripted::polite();
        let mut handle: Box<dyn ProcessHandle> = Box::new(fake);

        let outcome = terminate_with_grace(&mut handle, Duration::from_secs(5), &bus).await;

        assert!(interrupted.load(Ordering::SeqCst));
        assert!(!killed.load(Ordering::SeqCst));
        assert!(!outcome.forced);
        assert_eq!(outcome.status, ExitStatus::Exited(0));
    }

    #[tokio::test(start_paused = true)]
    async fn stubborn_child_is_force_killed_after_grace() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let (fake, interrupted, killed) = Scripted::stubborn();
        let mut handle: Box<dyn ProcessHandle> = Box::new(fake);

        let outcome = terminate_with_grace(&mut handle, Duration::from_secs(5), &bus).await;

        // Interrupt always precedes the kill.
        assert!(interrupted.load(Ordering::SeqCst));
        assert!(killed.load(Ordering::SeqCst));
        assert!(outcome.forced);
        assert_eq!(outcome.status, ExitStatus::Signaled(9));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::InterruptSent);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, EventKind::GraceExceeded);
    }
}
