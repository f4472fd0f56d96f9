//! # LogWriter — simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [spawning] binary="/opt/envoy/bin/envoy"
//! [spawned] pid=4242
//! [terminate-requested] source="signal"
//! [interrupt-sent] pid=4242
//! [hook-failed] hook="admin-data-collector" err="connection refused"
//! [exited] status="exit code 0"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ProcessSpawning => {
                println!("[spawning] binary={:?}", e.reason);
            }
            EventKind::ProcessSpawned => {
                println!("[spawned] pid={:?}", e.pid);
            }
            EventKind::ProcessExited => {
                println!("[exited] status={:?}", e.status);
            }
            EventKind::TerminateRequested => {
                println!("[terminate-requested] source={:?}", e.reason);
            }
            EventKind::InterruptSent => {
                println!("[interrupt-sent] pid={:?}", e.pid);
            }
            EventKind::GraceExceeded => {
                println!("[grace-exceeded] pid={:?}", e.pid);
            }
            EventKind::HookFailed => {
                println!("[hook-failed] hook={:?} err={:?}", e.hook, e.reason);
            }
            EventKind::CollectorWrote => {
                println!("[collector-wrote] hook={:?} file={:?}", e.hook, e.file);
            }
            EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-overflow] subscriber={:?} reason={:?}",
                    e.hook, e.reason
                );
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={} info={}",
                    e.hook.as_deref().unwrap_or("unknown"),
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
