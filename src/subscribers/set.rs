//! # Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] distributes events to all registered subscribers
//! without blocking the publisher.
//!
//! ```text
//! emit(event)
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N
//!   while B processes N+5.
//! - **Overflow**: the event is dropped for that subscriber only and a
//!   `SubscriberOverflow` is published.
//! - **Isolation**: a slow or panicking subscriber does not affect others.
//!
//! `AssertUnwindSafe` is used for panic isolation; a subscriber that panics
//! while holding a lock inside an `Arc<Mutex<_>>` can leave that state
//! poisoned.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Sending half of one subscriber's queue.
struct Outbox {
    name: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for event subscribers.
pub struct SubscriberSet {
    outboxes: Vec<Outbox>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates the set and spawns one worker task per subscriber.
    ///
    /// Each subscriber gets a bounded mpsc queue (capacity from
    /// [`Subscribe::queue_capacity`], minimum 1) and a dedicated worker that
    /// runs until the queue is closed.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (outboxes, workers) = subs
            .into_iter()
            .map(|sub| spawn_worker(sub, bus.clone()))
            .unzip();
        Self {
            outboxes,
            workers,
            bus,
        }
    }

    /// Emits an event to all subscribers (non-blocking, uses `try_send`).
    ///
    /// On queue full or closed the event is dropped for that subscriber and
    /// a `SubscriberOverflow` is published — unless the event itself is an
    /// overflow report, which prevents feedback loops.
    pub fn emit(&self, event: &Event) {
        let report_drops = !matches!(event.kind, EventKind::SubscriberOverflow);
        let event = Arc::new(event.clone());

        for outbox in &self.outboxes {
            let Err(rejected) = outbox.queue.try_send(Arc::clone(&event)) else {
                continue;
            };
            if report_drops {
                let why = match rejected {
                    mpsc::error::TrySendError::Full(_) => "full",
                    mpsc::error::TrySendError::Closed(_) => "closed",
                };
                self.bus
                    .publish(Event::subscriber_overflow(outbox.name, why));
            }
        }
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// Drops the queue senders (workers see the queue close after draining
    /// it) and awaits every worker task.
    pub async fn shutdown(self) {
        drop(self.outboxes);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Spawns the dedicated worker for one subscriber and returns its queue.
///
/// The worker drains the queue in FIFO order and turns panics into
/// `SubscriberPanicked` events instead of tearing anything down.
fn spawn_worker(sub: Arc<dyn Subscribe>, bus: Bus) -> (Outbox, JoinHandle<()>) {
    let name = sub.name();
    let (queue, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));

    let worker = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let delivery = AssertUnwindSafe(sub.on_event(&event)).catch_unwind();
            if let Err(payload) = delivery.await {
                bus.publish(Event::subscriber_panicked(
                    sub.name(),
                    panic_message(payload.as_ref()),
                ));
            }
        }
    });
    (Outbox { name, queue }, worker)
}

/// Best-effort rendering of a panic payload into a message.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| (*s).to_string()))
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "counter"
        }
    }

    #[tokio::test]
    async fn events_reach_every_subscriber() {
        let bus = Bus::new(8);
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(
            vec![
                Arc::new(Counter(a.clone())) as Arc<dyn Subscribe>,
                Arc::new(Counter(b.clone())),
            ],
            bus,
        );

        set.emit(&Event::now(EventKind::ProcessSpawned).with_pid(1));
        set.emit(&Event::now(EventKind::ProcessExited));
        set.shutdown().await;

        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[tokio::test]
    async fn panic_is_isolated_and_reported() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panicker) as Arc<dyn Subscribe>], bus);

        set.emit(&Event::now(EventKind::ProcessSpawned));
        set.shutdown().await;

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.hook.as_deref(), Some("panicker"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn panic_payload_rendering_covers_both_string_forms() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let opaque: Box<dyn Any + Send> = Box::new(17_u32);

        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(opaque.as_ref()), "unknown panic");
    }
}
