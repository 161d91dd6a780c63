//! Broadcast Hub
//!
//! Owns the registry of live subscriptions and fans published telemetry out
//! to each of them. Every subscription gets its own bounded buffer; a buffer
//! that fills up marks its subscriber as dead and it is evicted on the spot,
//! so a slow viewer can never stall the producer or the other viewers.

use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::messages::{Frame, TelemetryEvent};
use super::subscription::Subscription;

/// Unique identifier for a subscription
pub type SubscriptionId = Uuid;

/// Configuration for the broadcast hub
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Frames a subscription may have pending before it is evicted
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Idle seconds before a keep-alive frame is sent
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

fn default_buffer_capacity() -> usize {
    100
}

fn default_keep_alive_secs() -> u64 {
    30
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl HubConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

/// The set of subscriptions eligible for future publishes
#[derive(Default)]
struct Registry {
    /// Write half of each subscription's buffer
    subscribers: HashMap<SubscriptionId, mpsc::Sender<Frame>>,
    /// Set once the hub is shut down; no new subscriptions after that
    closed: bool,
}

/// Fans telemetry out to every live subscription
///
/// All registry mutation (subscribe, unsubscribe, the publish scan and its
/// evictions) happens under one lock, so a publish either fully sees a
/// subscription or fully does not.
pub struct BroadcastHub {
    registry: Mutex<Registry>,
    config: HubConfig,
    published: AtomicU64,
    evicted: AtomicU64,
}

/// Outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscriptions the frame was buffered to
    pub delivered: usize,
    /// Subscriptions evicted during this publish
    pub evicted: usize,
}

/// Point-in-time hub counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub subscribers: usize,
    pub published: u64,
    pub evicted: u64,
}

impl BroadcastHub {
    /// Create a new hub with an empty registry
    pub fn new(config: HubConfig) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            config,
            published: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Open a new subscription
    ///
    /// The returned subscription is already registered: anything published
    /// from here on is buffered for it, even before its stream is polled.
    /// Dropping it removes it from the registry.
    pub fn subscribe(self: &Arc<Self>) -> Result<Subscription, HubError> {
        let (sender, receiver) = mpsc::channel(self.config.buffer_capacity.max(1));
        let id = Uuid::new_v4();

        let total = {
            let mut registry = self.registry.lock();
            if registry.closed {
                return Err(HubError::ShuttingDown);
            }
            registry.subscribers.insert(id, sender);
            registry.subscribers.len()
        };

        tracing::info!(subscription_id = %id, subscribers = total, "Subscriber connected");

        Ok(Subscription::new(
            id,
            receiver,
            self.config.keep_alive(),
            Arc::clone(self),
        ))
    }

    /// Remove a subscription from the registry
    ///
    /// Idempotent: returns `false` if it was already gone (evicted, or
    /// removed by an earlier call).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let (removed, total) = {
            let mut registry = self.registry.lock();
            let removed = registry.subscribers.remove(&id).is_some();
            (removed, registry.subscribers.len())
        };

        if removed {
            tracing::info!(subscription_id = %id, subscribers = total, "Subscriber removed");
        }
        removed
    }

    /// Broadcast an event to every registered subscription
    ///
    /// The event is encoded once. Subscriptions whose buffer is full, or
    /// whose reader has gone away, are evicted as part of this call. Only an
    /// encoding failure is reported; subscriber problems never are.
    pub fn publish(&self, event: &TelemetryEvent) -> Result<PublishReport, HubError> {
        let frame = Frame::telemetry(event)?;
        Ok(self.publish_frame(frame))
    }

    fn publish_frame(&self, frame: Frame) -> PublishReport {
        let mut report = PublishReport::default();

        {
            let mut registry = self.registry.lock();
            registry
                .subscribers
                .retain(|id, sender| match sender.try_send(frame.clone()) {
                    Ok(()) => {
                        report.delivered += 1;
                        true
                    }
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!(subscription_id = %id, "Subscriber buffer full, evicting");
                        report.evicted += 1;
                        false
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(subscription_id = %id, "Subscriber gone, evicting");
                        report.evicted += 1;
                        false
                    }
                });
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        if report.evicted > 0 {
            self.evicted
                .fetch_add(report.evicted as u64, Ordering::Relaxed);
        }

        tracing::info!(
            delivered = report.delivered,
            evicted = report.evicted,
            "Broadcast telemetry"
        );

        report
    }

    /// Close every subscription and refuse new ones
    ///
    /// Dropping the write halves lets each send loop drain what it already
    /// has buffered and then end, so long-lived streams finish on shutdown.
    pub fn close(&self) -> usize {
        let dropped = {
            let mut registry = self.registry.lock();
            registry.closed = true;
            let dropped = registry.subscribers.len();
            registry.subscribers.clear();
            dropped
        };

        tracing::info!(subscribers = dropped, "Broadcast hub closed");
        dropped
    }

    /// Whether new subscriptions are still accepted
    pub fn is_open(&self) -> bool {
        !self.registry.lock().closed
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.registry.lock().subscribers.contains_key(&id)
    }

    /// Get the current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.subscriber_count(),
            published: self.published.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

/// Errors that can occur in the broadcast hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Failed to encode telemetry event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Hub is shutting down")]
    ShuttingDown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> TelemetryEvent {
        match value {
            serde_json::Value::Object(fields) => TelemetryEvent::from(fields),
            _ => panic!("test events must be objects"),
        }
    }

    fn small_hub(capacity: usize) -> Arc<BroadcastHub> {
        Arc::new(BroadcastHub::new(HubConfig {
            buffer_capacity: capacity,
            keep_alive_secs: 30,
        }))
    }

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.buffer_capacity, 100);
        assert_eq!(config.keep_alive(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_subscribe_unsubscribe() {
        let hub = Arc::new(BroadcastHub::default());

        let sub = hub.subscribe().unwrap();
        assert_eq!(hub.subscriber_count(), 1);
        assert!(hub.is_subscribed(sub.id()));

        assert!(hub.unsubscribe(sub.id()));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_twice_is_noop() {
        let hub = Arc::new(BroadcastHub::default());
        let a = hub.subscribe().unwrap();
        let _b = hub.subscribe().unwrap();
        assert_eq!(hub.subscriber_count(), 2);

        assert!(hub.unsubscribe(a.id()));
        assert!(!hub.unsubscribe(a.id()));
        assert_eq!(hub.subscriber_count(), 1);

        // Dropping the already-removed subscription must not touch the other one
        drop(a);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers() {
        let hub = BroadcastHub::default();
        let report = hub.publish(&event(json!({"speed": 1}))).unwrap();
        assert_eq!(report, PublishReport::default());
        assert_eq!(hub.stats().published, 1);
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber_in_order() {
        let hub = Arc::new(BroadcastHub::default());
        let mut subs: Vec<_> = (0..3).map(|_| hub.subscribe().unwrap()).collect();

        for i in 0..5 {
            let report = hub.publish(&event(json!({"seq": i}))).unwrap();
            assert_eq!(report.delivered, 3);
        }

        for sub in &mut subs {
            assert_eq!(sub.next_frame().await, Some(Frame::Connected));
            for i in 0..5 {
                let expected = Frame::telemetry(&event(json!({"seq": i}))).unwrap();
                assert_eq!(sub.next_frame().await, Some(expected));
            }
        }
    }

    #[tokio::test]
    async fn test_overflow_evicts_only_the_slow_subscriber() {
        let hub = Arc::new(BroadcastHub::default());
        let slow = hub.subscribe().unwrap();
        let mut fast = hub.subscribe().unwrap();
        assert_eq!(fast.next_frame().await, Some(Frame::Connected));

        for i in 0..100 {
            let report = hub.publish(&event(json!({"seq": i}))).unwrap();
            assert_eq!(report.evicted, 0);
            assert!(matches!(fast.next_frame().await, Some(Frame::Telemetry(_))));
        }
        assert!(hub.is_subscribed(slow.id()));

        let report = hub.publish(&event(json!({"seq": 100}))).unwrap();
        assert_eq!(report, PublishReport { delivered: 1, evicted: 1 });
        assert!(!hub.is_subscribed(slow.id()));
        assert!(hub.is_subscribed(fast.id()));
        assert!(matches!(fast.next_frame().await, Some(Frame::Telemetry(_))));

        let report = hub.publish(&event(json!({"seq": 101}))).unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(hub.stats().evicted, 1);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_not_delivered_to() {
        let hub = small_hub(4);
        let sub = hub.subscribe().unwrap();
        drop(sub);

        let report = hub.publish(&event(json!({"speed": 3}))).unwrap();
        assert_eq!(report.delivered, 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_close_refuses_new_subscribers() {
        let hub = Arc::new(BroadcastHub::default());
        let _sub = hub.subscribe().unwrap();

        assert_eq!(hub.close(), 1);
        assert!(!hub.is_open());
        assert_eq!(hub.subscriber_count(), 0);
        assert!(matches!(hub.subscribe(), Err(HubError::ShuttingDown)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_publish_and_churn() {
        // Large enough that the long-lived subscribers below never overflow
        let hub = small_hub(1024);
        let mut keepers: Vec<_> = (0..3).map(|_| hub.subscribe().unwrap()).collect();
        let mut tasks = Vec::new();

        for p in 0..4 {
            let hub = Arc::clone(&hub);
            tasks.push(tokio::spawn(async move {
                for i in 0..200 {
                    hub.publish(&event(json!({"producer": p, "seq": i}))).unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }

        for _ in 0..4 {
            let hub = Arc::clone(&hub);
            tasks.push(tokio::spawn(async move {
                for _ in 0..100 {
                    let sub = hub.subscribe().unwrap();
                    tokio::task::yield_now().await;
                    hub.unsubscribe(sub.id());
                    // Drop unsubscribes a second time
                    drop(sub);
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(hub.subscriber_count(), keepers.len());
        assert_eq!(hub.stats().published, 800);

        for sub in &mut keepers {
            assert!(hub.is_subscribed(sub.id()));
            assert_eq!(sub.next_frame().await, Some(Frame::Connected));

            let mut last_seq = [-1i64; 4];
            for _ in 0..800 {
                let Some(Frame::Telemetry(bytes)) = sub.next_frame().await else {
                    panic!("expected telemetry frame");
                };
                let json = &bytes[b"data: ".len()..bytes.len() - 2];
                let value: serde_json::Value = serde_json::from_slice(json).unwrap();
                let producer = value["producer"].as_u64().unwrap() as usize;
                let seq = value["seq"].as_i64().unwrap();
                assert!(seq > last_seq[producer], "frames from one producer arrive in order");
                last_seq[producer] = seq;
            }
            assert_eq!(last_seq, [199; 4]);
        }
    }
}
