use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::core::{HealthChecker, PipelineMetrics};
use crate::market::MarketFeed;
use crate::notifications::NotificationManager;
use crate::storage::SignalStore;
use crate::strategy::{Evaluation, Signal, SignalGenerator};
use crate::streaming::{Broadcaster, Event};

/// Monitoring task: indicator, signal and notification pass over every
/// instrument of the latest market view.
#[derive(Clone)]
pub struct SignalMonitor {
    feed: MarketFeed,
    generator: Arc<SignalGenerator>,
    store: Arc<dyn SignalStore>,
    broadcaster: Broadcaster,
    notifications: Arc<NotificationManager>,
    metrics: Arc<PipelineMetrics>,
    health: HealthChecker,
}

impl SignalMonitor {
    pub fn new(
        feed: MarketFeed,
        generator: Arc<SignalGenerator>,
        store: Arc<dyn SignalStore>,
        broadcaster: Broadcaster,
        notifications: Arc<NotificationManager>,
        metrics: Arc<PipelineMetrics>,
        health: HealthChecker,
    ) -> Self {
        Self {
            feed,
            generator,
            store,
            broadcaster,
            notifications,
            metrics,
            health,
        }
    }

    /// One pass in instrument table order. Returns the emitted signals.
    pub async fn run_cycle(&self) -> Vec<Signal> {
        let view = self.feed.view();
        let global_regime = view.state.volatility_regime;
        let mut emitted = Vec::new();

        for instrument in view.instruments.iter() {
            let history = match view.history(&instrument.symbol) {
                Some(history) => history,
                None => {
                    warn!("⚠️  No price history for {}, skipping", instrument.symbol);
                    continue;
                }
            };

            match self
                .generator
                .evaluate(&instrument.symbol, history, global_regime)
            {
                Evaluation::Emitted(signal) => {
                    self.emit(&signal).await;
                    emitted.push(signal);
                }
                Evaluation::InsufficientHistory { have, need } => {
                    debug!("📊 {} warming up ({}/{})", instrument.symbol, have, need);
                }
                _ => self.metrics.signals_discarded.inc(),
            }
        }

        emitted
    }

    async fn emit(&self, signal: &Signal) {
        self.metrics.signals_emitted.inc();
        info!(
            "🎯 SIGNAL: {} {} @ {:.5} (confidence: {:.1}, R:R {:.2}, {}, {:?})",
            signal.direction,
            signal.symbol,
            signal.entry_price,
            signal.confidence,
            signal.risk_reward_ratio,
            signal.regime,
            signal.quality
        );

        match self.store.save_signal(signal).await {
            Ok(()) => self.health.update_component("store", true).await,
            Err(e) => {
                error!("❌ Failed to persist signal {}: {}", signal.id, e);
                self.metrics.store_failures.inc();
                self.health.update_component("store", false).await;
            }
        }

        self.broadcaster
            .publish(&Event::NewSignal(signal.clone()))
            .await;
        self.notifications.notify(signal).await;
    }

    pub async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!("🔍 Monitoring loop started ({}s interval)", interval.as_secs());
        self.health.update_component("monitor", true).await;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let emitted = self.run_cycle().await;
                    if emitted.is_empty() {
                        debug!("📊 No signals this cycle");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        self.health.update_component("monitor", false).await;
        info!("🛑 Monitoring loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{SimulatorConfig, StrategyConfig};
    use crate::core::StoreError;
    use crate::market::{default_instruments, feed, PriceSimulator};
    use crate::notifications::NotificationSettings;
    use crate::storage::{MemoryStore, MockSignalStore, SignalQuery};

    fn feed_with(ticks: usize) -> MarketFeed {
        let config = SimulatorConfig {
            seed: Some(99),
            ..Default::default()
        };
        let (mut driver, feed) = feed::channel(PriceSimulator::new(default_instruments(), &config));
        driver.warm_up(ticks);
        // the receiver keeps the last published view after the driver is dropped
        feed
    }

    fn monitor(
        feed: MarketFeed,
        store: Arc<dyn SignalStore>,
        strategy: StrategyConfig,
    ) -> (SignalMonitor, Broadcaster, Arc<PipelineMetrics>) {
        let metrics = Arc::new(PipelineMetrics::new().unwrap());
        let broadcaster = Broadcaster::new(512, metrics.clone());
        let notifications = Arc::new(NotificationManager::new(
            store.clone(),
            broadcaster.clone(),
            NotificationSettings::default(),
            metrics.clone(),
            HealthChecker::new(),
        ));
        let monitor = SignalMonitor::new(
            feed,
            Arc::new(SignalGenerator::new(&strategy)),
            store,
            broadcaster.clone(),
            notifications,
            metrics.clone(),
            HealthChecker::new(),
        );
        (monitor, broadcaster, metrics)
    }

    #[tokio::test]
    async fn test_cycle_persists_and_publishes_signals() {
        let store = Arc::new(MemoryStore::new(100));
        let permissive = StrategyConfig {
            min_confidence: 0.0,
            min_risk_reward: 0.0,
            ..Default::default()
        };
        let (monitor, broadcaster, metrics) = monitor(feed_with(150), store.clone(), permissive);
        let mut sub = broadcaster.subscribe().await;

        let emitted = monitor.run_cycle().await;
        assert_eq!(emitted.len(), default_instruments().len());

        let order: Vec<_> = emitted.iter().map(|s| s.symbol.clone()).collect();
        let expected: Vec<_> = default_instruments().into_iter().map(|i| i.symbol).collect();
        assert_eq!(order, expected);

        let stored = store.recent_signals(&SignalQuery::default()).await.unwrap();
        assert_eq!(stored.len(), emitted.len());
        assert_eq!(metrics.signals_emitted.get(), emitted.len() as u64);

        let first = sub.rx.recv().await.unwrap();
        assert!(first.contains("\"type\":\"new_signal\""));
    }

    #[tokio::test]
    async fn test_short_history_emits_nothing() {
        let store = Arc::new(MemoryStore::new(100));
        let (monitor, _broadcaster, metrics) =
            monitor(feed_with(50), store.clone(), StrategyConfig::default());

        assert!(monitor.run_cycle().await.is_empty());
        assert_eq!(metrics.signals_discarded.get(), 0);
        assert!(store.recent_alerts(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_keeps_cycle_running() {
        let mut store = MockSignalStore::new();
        store
            .expect_save_signal()
            .returning(|_| Err(StoreError::Unavailable("offline".to_string())));
        store.expect_save_alert().returning(|_| Ok(()));
        let permissive = StrategyConfig {
            min_confidence: 0.0,
            min_risk_reward: 0.0,
            ..Default::default()
        };
        let (monitor, _broadcaster, metrics) = monitor(feed_with(150), Arc::new(store), permissive);

        let emitted = monitor.run_cycle().await;
        assert_eq!(emitted.len(), default_instruments().len());
        assert_eq!(metrics.store_failures.get(), emitted.len() as u64);
    }
}
