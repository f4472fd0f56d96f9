//! # Admin data collection hook.
//!
//! [`AdminDataCollector`] harvests runtime diagnostics from the proxy's
//! admin endpoint into the debug store:
//!
//! - **post-start**: spawns a readiness poller scoped to the run's
//!   cancellation token. The admin port only answers once the proxy
//!   finished its own startup, so the poller retries until the endpoint
//!   responds or the run terminates, and records the first success on the
//!   hook.
//! - **shutdown**: fetches `/server_info`, `/clusters` and `/stats`
//!   (fresh round trips, nothing cached) and writes them verbatim to the
//!   fixed filenames. Each fetch is independent and best-effort: a failure
//!   becomes a `<file>.error` note in the store, never a run failure. The
//!   note carries the recorded readiness, distinguishing an admin endpoint
//!   that never came up from a fetch that raced the proxy's exit.
//!
//! Runs with a disabled admin interface are a no-op for both phases.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::HookError;
use crate::events::{Event, EventKind};
use crate::hooks::hook::{Hook, RunContext};
use crate::store::{CLUSTERS_FILE, SERVER_INFO_FILE, STATS_FILE};

/// Admin endpoints and the store files their payloads land in.
const SNAPSHOTS: &[(&str, &str)] = &[
    ("/server_info", SERVER_INFO_FILE),
    ("/clusters", CLUSTERS_FILE),
    ("/stats", STATS_FILE),
];

/// Interval between readiness probes.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Collects admin-endpoint diagnostics into the debug store.
#[derive(Default)]
pub struct AdminDataCollector {
    /// Set by the readiness poller on the first successful admin response.
    ready: Arc<AtomicBool>,
}

impl AdminDataCollector {
    /// Construct a new collector hook.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Hook for AdminDataCollector {
    fn name(&self) -> &str {
        "admin-data-collector"
    }

    async fn post_start(&self, ctx: &RunContext) -> Result<(), HookError> {
        if !ctx.admin.enabled() {
            return Ok(());
        }
        let admin = ctx.admin.clone();
        let token = ctx.token.child_token();
        let ready = Arc::clone(&self.ready);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    res = admin.get("/server_info") => {
                        if res.is_ok() {
                            ready.store(true, Ordering::SeqCst);
                            return;
                        }
                    }
                }
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                }
            }
        });
        Ok(())
    }

    async fn shutdown(&self, ctx: &RunContext) -> Result<(), HookError> {
        if !ctx.admin.enabled() {
            return Ok(());
        }
        for (path, file) in SNAPSHOTS {
            match ctx.admin.get(path).await {
                Ok(bytes) => {
                    ctx.store.write(file, &bytes).await?;
                    ctx.bus.publish(
                        Event::now(EventKind::CollectorWrote)
                            .with_hook(self.name())
                            .with_file(*file),
                    );
                }
                Err(e) => {
                    // Keep going; the note says whether the endpoint was
                    // ever observed answering, so a fetch racing the
                    // child's exit reads differently from a proxy whose
                    // admin never came up.
                    let verdict = if self.ready.load(Ordering::SeqCst) {
                        "admin answered earlier in the run; this fetch raced the proxy's exit"
                    } else {
                        "admin never answered during the run"
                    };
                    let note = format!("{file}.error");
                    let body = format!("{e}\n{verdict}\n");
                    let _ = ctx.store.write(&note, body.as_bytes()).await;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::AdminClient;
    use crate::events::Bus;
    use crate::store::DebugStore;
    use tokio_util::sync::CancellationToken;

    fn ctx_with_admin(admin: AdminClient, bus: &Bus) -> (RunContext, tempfile::TempDir) {
        let base = tempfile::tempdir().unwrap();
        let ctx = RunContext {
            admin,
            store: Arc::new(DebugStore::create(base.path()).unwrap()),
            token: CancellationToken::new(),
            pid: None,
            bus: bus.clone(),
        };
        (ctx, base)
    }

    #[tokio::test]
    async fn disabled_admin_is_a_noop() {
        let bus = Bus::new(8);
        let (ctx, _base) = ctx_with_admin(AdminClient::disabled(), &bus);
        let hook = AdminDataCollector::new();

        hook.post_start(&ctx).await.unwrap();
        hook.shutdown(&ctx).await.unwrap();

        assert!(!ctx.store.path().join(SERVER_INFO_FILE).exists());
        assert!(!ctx
            .store
            .path()
            .join(format!("{SERVER_INFO_FILE}.error"))
            .exists());
    }

    #[tokio::test]
    async fn unreachable_admin_is_noted_as_never_ready() {
        let bus = Bus::new(8);
        // Port 1 is essentially never listening; every probe is refused.
        let (ctx, _base) = ctx_with_admin(AdminClient::new("127.0.0.1", 1), &bus);
        let hook = AdminDataCollector::new();

        hook.post_start(&ctx).await.unwrap();
        ctx.token.cancel();
        hook.shutdown(&ctx).await.unwrap();

        let note = ctx.store.path().join(format!("{SERVER_INFO_FILE}.error"));
        let body = std::fs::read_to_string(note).unwrap();
        assert!(
            body.contains("admin never answered during the run"),
            "error note must carry the recorded readiness: {body}"
        );
        assert!(!ctx.store.path().join(SERVER_INFO_FILE).exists());
    }
}
