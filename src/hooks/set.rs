//! # Hook composer: ordered application with per-phase error policy.
//!
//! [`HookSet`] owns the error-handling policy the individual hooks must not
//! re-implement:
//!
//! ```text
//! pre_start:  hook1 ─► hook2 ─► hook3     first error aborts the phase
//! post_start: hook1 ─► hook2 ─► hook3     errors → HookFailed event, continue
//! shutdown:   hook1 ─► hook2 ─► hook3     errors → HookFailed event, continue
//! ```
//!
//! ## Rules
//! - Registration order is preserved for every phase; no reordering, no
//!   deduplication.
//! - Pre-start is fail-fast: no partial configuration ever reaches spawn.
//! - Post-start/shutdown are best-effort enrichment: one failing collector
//!   must not starve the others of their chance to run.

use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::error::HookError;
use crate::events::{Bus, Event, EventKind};
use crate::hooks::hook::{Hook, RunContext};

/// Ordered set of lifecycle hooks.
pub struct HookSet {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookSet {
    /// Creates the set; order is the caller's registration order.
    pub fn new(hooks: Vec<Arc<dyn Hook>>) -> Self {
        Self { hooks }
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// True when no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Applies pre-start mutators in order; the first error aborts the
    /// phase and is returned with the offending hook's name.
    pub async fn apply_pre_start(
        &self,
        cfg: &mut RuntimeConfig,
    ) -> Result<(), (String, HookError)> {
        for hook in &self.hooks {
            if let Err(e) = hook.pre_start(cfg).await {
                return Err((hook.name().to_string(), e));
            }
        }
        Ok(())
    }

    /// Applies post-start actions in order; failures are published as
    /// [`EventKind::HookFailed`] and remaining hooks still run.
    pub async fn apply_post_start(&self, ctx: &RunContext, bus: &Bus) {
        for hook in &self.hooks {
            if let Err(e) = hook.post_start(ctx).await {
                bus.publish(
                    Event::now(EventKind::HookFailed)
                        .with_hook(hook.name())
                        .with_reason(format!("post-start: {e}")),
                );
            }
        }
    }

    /// Applies shutdown actions in order; failures are published as
    /// [`EventKind::HookFailed`] and remaining hooks still run.
    pub async fn apply_shutdown(&self, ctx: &RunContext, bus: &Bus) {
        for hook in &self.hooks {
            if let Err(e) = hook.shutdown(ctx).await {
                bus.publish(
                    Event::now(EventKind::HookFailed)
                        .with_hook(hook.name())
                        .with_reason(format!("shutdown: {e}")),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::AdminClient;
    use crate::store::DebugStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_pre_start: bool,
        fail_shutdown: bool,
    }

    #[async_trait]
    impl Hook for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn pre_start(&self, cfg: &mut RuntimeConfig) -> Result<(), HookError> {
            self.log.lock().unwrap().push(format!("{}:pre", self.name));
            if self.fail_pre_start {
                return Err(HookError::failed("pre-start boom"));
            }
            // Later hooks must see this mutation.
            cfg.ip_addresses.push(self.name.to_string());
            Ok(())
        }

        async fn shutdown(&self, _ctx: &RunContext) -> Result<(), HookError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:shutdown", self.name));
            if self.fail_shutdown {
                return Err(HookError::failed("shutdown boom"));
            }
            Ok(())
        }
    }

    fn recorder(
        name: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
        fail_pre_start: bool,
        fail_shutdown: bool,
    ) -> Arc<dyn Hook> {
        Arc::new(Recorder {
            name,
            log: log.clone(),
            fail_pre_start,
            fail_shutdown,
        })
    }

    fn test_ctx(bus: &Bus) -> (RunContext, tempfile::TempDir) {
        let base = tempfile::tempdir().unwrap();
        let ctx = RunContext {
            admin: AdminClient::disabled(),
            store: Arc::new(DebugStore::create(base.path()).unwrap()),
            token: CancellationToken::new(),
            pid: None,
            bus: bus.clone(),
        };
        (ctx, base)
    }

    #[tokio::test]
    async fn pre_start_runs_in_order_and_mutations_are_visible() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = HookSet::new(vec![
            recorder("a", &log, false, false),
            recorder("b", &log, false, false),
        ]);

        let mut cfg = RuntimeConfig::new("/bin/true");
        set.apply_pre_start(&mut cfg).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a:pre", "b:pre"]);
        // Both mutations reached the final configuration, in order.
        assert_eq!(cfg.ip_addresses, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn pre_start_is_fail_fast() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = HookSet::new(vec![
            recorder("a", &log, true, false),
            recorder("b", &log, false, false),
        ]);

        let mut cfg = RuntimeConfig::new("/bin/true");
        let (name, _err) = set.apply_pre_start(&mut cfg).await.unwrap_err();

        assert_eq!(name, "a");
        // Hook "b" never ran and the failed hook's mutation was not kept
        // by anyone downstream.
        assert_eq!(*log.lock().unwrap(), vec!["a:pre"]);
    }

    #[tokio::test]
    async fn shutdown_continues_past_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = HookSet::new(vec![
            recorder("a", &log, false, true),
            recorder("b", &log, false, false),
        ]);

        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let (ctx, _base) = test_ctx(&bus);
        set.apply_shutdown(&ctx, &bus).await;

        assert_eq!(*log.lock().unwrap(), vec!["a:shutdown", "b:shutdown"]);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::HookFailed);
        assert_eq!(ev.hook.as_deref(), Some("a"));
    }
}
