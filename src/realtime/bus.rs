/**
 * Event Bus
 *
 * In-process publish/subscribe hub used for every real-time topic.
 *
 * # Delivery
 *
 * Each subscription owns an unbounded queue drained by its own task, so
 * `publish` never blocks and never waits for a handler. Events published on
 * one topic reach a given subscriber in publish order. Nothing is stored:
 * an event published while a topic has no subscriber is dropped.
 *
 * # Handler Isolation
 *
 * A handler that returns an error or panics only affects its own delivery.
 * The error is logged and the subscription keeps draining its queue; other
 * subscribers are never involved.
 *
 * # Cancellation
 *
 * `subscribe` returns a [`Subscription`]. Calling `unsubscribe` on it (any
 * number of times) or dropping it removes the handler. Events already
 * queued for that handler are still delivered.
 */
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tokio::sync::mpsc;

use crate::shared::{SyncError, SyncEvent, Topic};

/// Receiver of bus events
///
/// Implemented for every `Fn(SyncEvent) -> impl Future<Output = Result<(), SyncError>>`.
pub trait EventHandler: Send + Sync + 'static {
    fn handle(&self, event: SyncEvent) -> BoxFuture<'static, Result<(), SyncError>>;
}

impl<F, Fut> EventHandler for F
where
    F: Fn(SyncEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SyncError>> + Send + 'static,
{
    fn handle(&self, event: SyncEvent) -> BoxFuture<'static, Result<(), SyncError>> {
        Box::pin(self(event))
    }
}

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<SyncEvent>,
}

#[derive(Default)]
struct BusInner {
    topics: RwLock<HashMap<Topic, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn remove(&self, topic: Topic, id: u64) -> bool {
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        let Some(subscribers) = topics.get_mut(&topic) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        before != subscribers.len()
    }
}

/// Publish/subscribe hub
///
/// Cheap to clone; clones share the same subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`
    ///
    /// Must be called from within a Tokio runtime: the handler runs on a
    /// task of its own.
    pub fn subscribe<H: EventHandler>(&self, topic: Topic, handler: H) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = mpsc::unbounded_channel::<SyncEvent>();

        self.inner
            .topics
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(topic)
            .or_default()
            .push(Subscriber { id, tx });

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
                    Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
                    Err(panic) => Err(panic),
                };
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!("[Realtime] Handler {} on '{}' failed: {}", id, topic, e);
                    }
                    Err(_) => {
                        tracing::error!("[Realtime] Handler {} on '{}' panicked", id, topic);
                    }
                }
            }
            tracing::debug!("[Realtime] Subscription {} on '{}' drained", id, topic);
        });

        tracing::debug!("[Realtime] Subscription {} registered on '{}'", id, topic);

        Subscription {
            id,
            topic,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every current subscriber of its topic
    ///
    /// # Returns
    ///
    /// Number of subscribers the event was queued for (0 if none)
    pub fn publish(&self, event: SyncEvent) -> usize {
        let topic = event.topic();
        let topics = self.inner.topics.read().unwrap_or_else(|e| e.into_inner());
        let Some(subscribers) = topics.get(&topic).filter(|s| !s.is_empty()) else {
            tracing::debug!("[Realtime] No subscribers for '{}', event dropped", topic);
            return 0;
        };

        let delivered = subscribers
            .iter()
            .filter(|subscriber| subscriber.tx.send(event.clone()).is_ok())
            .count();

        tracing::debug!("[Realtime] Event '{}' queued for {} subscribers", topic, delivered);
        delivered
    }

    /// Number of live subscriptions on `topic`
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.inner
            .topics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&topic)
            .map_or(0, Vec::len)
    }
}

/// Cancellation handle returned by [`EventBus::subscribe`]
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: u64,
    topic: Topic,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Remove the handler; safe to call more than once
    pub fn unsubscribe(&self) {
        if let Some(bus) = self.bus.upgrade() {
            if bus.remove(self.topic, self.id) {
                tracing::debug!("[Realtime] Subscription {} on '{}' cancelled", self.id, self.topic);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ParticipantId;
    use tokio::time::{timeout, Duration};

    fn forward(tx: mpsc::UnboundedSender<SyncEvent>) -> impl EventHandler {
        move |event: SyncEvent| {
            let tx = tx.clone();
            async move {
                tx.send(event).map_err(|_| SyncError::connection(0, "receiver gone"))
            }
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> SyncEvent {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("event not delivered in time")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_publish_reaches_topic_subscribers_only() {
        let bus = EventBus::new();
        let (typing_tx, mut typing_rx) = mpsc::unbounded_channel();
        let (presence_tx, mut presence_rx) = mpsc::unbounded_channel();
        let _typing = bus.subscribe(Topic::Typing, forward(typing_tx));
        let _presence = bus.subscribe(Topic::Presence, forward(presence_tx));

        let delivered = bus.publish(SyncEvent::typing(ParticipantId::A, true));
        assert_eq!(delivered, 1);
        assert_eq!(next(&mut typing_rx).await, SyncEvent::typing(ParticipantId::A, true));
        assert!(presence_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(SyncEvent::typing(ParticipantId::A, true)), 0);
    }

    #[tokio::test]
    async fn test_fifo_within_topic() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = bus.subscribe(Topic::Typing, forward(tx));

        for i in 0..50 {
            bus.publish(SyncEvent::typing(ParticipantId::B, i % 2 == 0));
        }
        for i in 0..50 {
            assert_eq!(next(&mut rx).await, SyncEvent::typing(ParticipantId::B, i % 2 == 0));
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let sub = bus.subscribe(Topic::Typing, forward(tx));
        assert_eq!(bus.subscriber_count(Topic::Typing), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(Topic::Typing), 0);
        drop(sub);
        assert_eq!(bus.publish(SyncEvent::typing(ParticipantId::A, true)), 0);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_block_others() {
        let bus = EventBus::new();
        let _failing = bus.subscribe(Topic::Typing, |_event: SyncEvent| async move {
            Err::<(), _>(SyncError::validation("event", "rejected"))
        });
        let _panicking = bus.subscribe(Topic::Typing, |_event: SyncEvent| async move {
            panic!("handler bug");
            #[allow(unreachable_code)]
            Ok(())
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _healthy = bus.subscribe(Topic::Typing, forward(tx));

        assert_eq!(bus.publish(SyncEvent::typing(ParticipantId::A, true)), 3);
        assert_eq!(bus.publish(SyncEvent::typing(ParticipantId::A, false)), 3);
        assert_eq!(next(&mut rx).await, SyncEvent::typing(ParticipantId::A, true));
        assert_eq!(next(&mut rx).await, SyncEvent::typing(ParticipantId::A, false));
    }
}
