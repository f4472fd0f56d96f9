//! # Process handle abstraction.
//!
//! [`ProcessHandle`] is the seam between the runtime and the operating
//! system: production code wraps a [`tokio::process::Child`], tests inject
//! a fake, so the termination race (interrupt vs. voluntary exit vs. forced
//! kill) is testable without spawning a real proxy.
//!
//! [`ExitStatus`] is our own portable rendering of a child's exit, since
//! `std::process::ExitStatus` cannot be constructed by test code.

use std::io;

use async_trait::async_trait;

/// Portable exit status of the proxy subprocess.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// The child exited with a code.
    Exited(i32),
    /// The child was terminated by a signal (unix).
    Signaled(i32),
    /// Exit reason could not be determined.
    Unknown,
}

impl ExitStatus {
    /// True for a zero exit code.
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit code {code}"),
            ExitStatus::Signaled(sig) => write!(f, "signal {sig}"),
            ExitStatus::Unknown => f.write_str("unknown"),
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitStatus::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return ExitStatus::Signaled(sig);
            }
        }
        ExitStatus::Unknown
    }
}

/// Handle to a spawned (or fake) proxy subprocess.
///
/// The runtime only ever drives one handle, sequentially:
/// `wait` races against the termination trigger, then `interrupt` and
/// possibly `kill` follow once the race is decided.
#[async_trait]
pub trait ProcessHandle: Send {
    /// OS process id, if the process still exists.
    fn id(&self) -> Option<u32>;

    /// Waits for the child to exit. Must be cancel-safe: dropping the
    /// future leaves the handle usable.
    async fn wait(&mut self) -> io::Result<ExitStatus>;

    /// Forwards an interrupt (SIGINT) to the child, asking for a graceful
    /// connection drain. Must precede any `kill`.
    fn interrupt(&mut self) -> io::Result<()>;

    /// Forcibly kills the child. Used only after the grace period expires.
    async fn kill(&mut self) -> io::Result<()>;
}

/// Production handle wrapping a [`tokio::process::Child`].
pub struct ChildHandle {
    child: tokio::process::Child,
}

impl ChildHandle {
    /// Wraps a spawned child.
    pub fn new(child: tokio::process::Child) -> Self {
        Self { child }
    }
}

#[async_trait]
impl ProcessHandle for ChildHandle {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        Ok(status.into())
    }

    #[cfg(unix)]
    fn interrupt(&mut self) -> io::Result<()> {
        let pid = self
            .child
            .id()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "child already exited"))?;
        // tokio::process cannot deliver arbitrary signals; go through libc.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn interrupt(&mut self) -> io::Result<()> {
        // No interrupt equivalent; escalate straight to kill.
        self.child.start_kill()
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_display() {
        assert_eq!(ExitStatus::Exited(0).to_string(), "exit code 0");
        assert_eq!(ExitStatus::Signaled(2).to_string(), "signal 2");
        assert!(ExitStatus::Exited(0).success());
        assert!(!ExitStatus::Exited(1).success());
        assert!(!ExitStatus::Signaled(9).success());
    }
}
