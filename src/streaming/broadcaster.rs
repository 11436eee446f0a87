use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, info, warn};

use super::events::{market_snapshot, Event};
use crate::core::{HealthChecker, PipelineMetrics};
use crate::market::MarketFeed;

pub type SubscriberId = u64;

/// Receiving half handed to a transport connection.
pub struct Subscription {
    pub id: SubscriberId,
    pub rx: mpsc::Receiver<Arc<str>>,
}

/// Fan-out of serialized events to live subscribers. Every subscriber owns a
/// bounded queue; a closed or full queue gets that subscriber evicted on the
/// next publish.
#[derive(Clone)]
pub struct Broadcaster {
    subscribers: Arc<RwLock<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>>,
    next_id: Arc<AtomicU64>,
    buffer: usize,
    metrics: Arc<PipelineMetrics>,
}

impl Broadcaster {
    pub fn new(buffer: usize, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            buffer: buffer.max(1),
            metrics,
        }
    }

    pub async fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(id, tx);
        self.metrics.subscribers.set(subscribers.len() as i64);
        info!("🔌 Subscriber {} connected ({} live)", id, subscribers.len());

        Subscription { id, rx }
    }

    pub async fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(&id).is_some() {
            self.metrics.subscribers.set(subscribers.len() as i64);
            info!("🔌 Subscriber {} disconnected ({} live)", id, subscribers.len());
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Returns how many subscribers accepted the event. Failed subscribers are
    /// removed; nothing is reported back to the caller.
    pub async fn publish(&self, event: &Event) -> usize {
        let payload: Arc<str> = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!("⚠️  Failed to serialize {} event: {}", event.kind(), e);
                return 0;
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        {
            let subscribers = self.subscribers.read().await;
            for (id, tx) in subscribers.iter() {
                match tx.try_send(payload.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("🐌 Subscriber {} is not keeping up, evicting", id);
                        failed.push(*id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => failed.push(*id),
                }
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in &failed {
                subscribers.remove(id);
            }
            self.metrics.broadcast_evictions.inc_by(failed.len() as u64);
            self.metrics.subscribers.set(subscribers.len() as i64);
            debug!("🧹 Removed {} dead subscriber(s)", failed.len());
        }

        delivered
    }

    /// Periodic `market_update` loop over the latest published market view.
    pub async fn run_snapshots(
        self,
        feed: MarketFeed,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
        health: HealthChecker,
    ) {
        info!("📡 Snapshot loop started ({}s interval)", interval.as_secs());
        health.update_component("broadcaster", true).await;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let view = feed.view();
                    let tickers = market_snapshot(&view);
                    if tickers.is_empty() {
                        continue;
                    }
                    let delivered = self.publish(&Event::MarketUpdate(tickers)).await;
                    debug!("📡 Market snapshot sent to {} subscriber(s)", delivered);
                }
                _ = shutdown.changed() => break,
            }
        }

        health.update_component("broadcaster", false).await;
        info!("🛑 Snapshot loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::alert::fixtures;
    use tokio_test::assert_ok;

    fn broadcaster(buffer: usize) -> Broadcaster {
        Broadcaster::new(buffer, Arc::new(PipelineMetrics::new().unwrap()))
    }

    fn event() -> Event {
        Event::NewSignal(fixtures::signal("BTCUSDT", 75.0))
    }

    #[tokio::test]
    async fn test_failed_subscriber_is_removed_others_still_receive() {
        let hub = broadcaster(8);
        let mut a = hub.subscribe().await;
        let b = hub.subscribe().await;
        let mut c = hub.subscribe().await;
        drop(b.rx);

        let delivered = hub.publish(&event()).await;
        assert_eq!(delivered, 2);
        assert_eq!(hub.subscriber_count().await, 2);
        assert_eq!(hub.metrics.broadcast_evictions.get(), 1);

        let payload = a.rx.recv().await.unwrap();
        assert!(payload.contains("\"type\":\"new_signal\""));
        assert_ok!(c.rx.try_recv());
    }

    #[tokio::test]
    async fn test_full_queue_evicts_slow_subscriber() {
        let hub = broadcaster(1);
        let _slow = hub.subscribe().await;

        assert_eq!(hub.publish(&event()).await, 1);
        assert_eq!(hub.publish(&event()).await, 0);
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_updates_gauge() {
        let hub = broadcaster(4);
        let first = hub.subscribe().await;
        let _second = hub.subscribe().await;
        assert_eq!(hub.metrics.subscribers.get(), 2);

        hub.unsubscribe(first.id).await;
        assert_eq!(hub.subscriber_count().await, 1);
        assert_eq!(hub.metrics.subscribers.get(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_during_publish() {
        let hub = broadcaster(64);
        let publisher = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    hub.publish(&event()).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut subs = Vec::new();
        for _ in 0..10 {
            subs.push(hub.subscribe().await);
            tokio::task::yield_now().await;
        }
        publisher.await.unwrap();
        assert_eq!(hub.subscriber_count().await, 10);
    }
}
