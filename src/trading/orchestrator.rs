use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::monitor::SignalMonitor;
use crate::core::{Config, HealthChecker, PipelineMetrics};
use crate::execution::{
    build_broker, execution_alert, format_for_execution, Broker, ExecutionOrder, ExecutionOutcome,
};
use crate::market::{default_instruments, feed, MarketFeed, PriceSimulator, TickDriver};
use crate::notifications::NotificationManager;
use crate::storage::{self, SignalQuery, SignalStore};
use crate::strategy::{Analysis, MarketRegime, SignalGenerator};
use crate::streaming::Broadcaster;

/// Handles shared by the pipeline tasks and the HTTP layer.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub feed: MarketFeed,
    pub generator: Arc<SignalGenerator>,
    pub store: Arc<dyn SignalStore>,
    pub broadcaster: Broadcaster,
    pub notifications: Arc<NotificationManager>,
    pub broker: Arc<dyn Broker>,
    pub metrics: Arc<PipelineMetrics>,
    pub health: HealthChecker,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorReport {
    pub symbol: String,
    pub history_points: usize,
    #[serde(flatten)]
    pub analysis: Analysis,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarketStats {
    pub average_score: f64,
    pub max_score: f64,
    pub average_risk_reward: f64,
    pub trending_markets: usize,
    pub total_signals: usize,
    pub active_symbols: usize,
    pub volatility_regime: String,
}

/// Window of stored signals the stats endpoint summarizes.
const STATS_SAMPLE: usize = 500;

impl AppContext {
    pub fn indicators(&self, symbol: &str) -> Option<IndicatorReport> {
        let view = self.feed.view();
        let history = view.history(symbol)?;
        Some(IndicatorReport {
            symbol: symbol.to_string(),
            history_points: history.len(),
            analysis: self.generator.analyze(history),
        })
    }

    pub async fn stats(&self) -> Result<MarketStats> {
        let query = SignalQuery {
            limit: STATS_SAMPLE,
            per_symbol: STATS_SAMPLE,
            ..Default::default()
        };
        let signals = self.store.recent_signals(&query).await?;

        let total = signals.len();
        let (average_score, max_score, average_risk_reward) = if total == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = signals.iter().map(|s| s.confidence).sum();
            let max = signals.iter().map(|s| s.confidence).fold(0.0, f64::max);
            let rr: f64 = signals.iter().map(|s| s.risk_reward_ratio).sum();
            (sum / total as f64, max, rr / total as f64)
        };

        let mut active: Vec<&str> = signals.iter().map(|s| s.symbol.as_str()).collect();
        active.sort_unstable();
        active.dedup();

        let view = self.feed.view();
        let trending_markets = view
            .instruments
            .iter()
            .filter_map(|i| view.history(&i.symbol))
            .filter(|h| self.generator.analyze(h).regime == MarketRegime::Trending)
            .count();

        Ok(MarketStats {
            average_score,
            max_score,
            average_risk_reward,
            trending_markets,
            total_signals: total,
            active_symbols: active.len(),
            volatility_regime: view.state.volatility_regime.to_string(),
        })
    }

    /// Formats a stored signal for execution; `None` when the id is unknown.
    pub async fn format_signal(
        &self,
        signal_id: Uuid,
        amount: Option<f64>,
        expiration_minutes: Option<u32>,
    ) -> Result<Option<ExecutionOrder>> {
        let signal = match self.store.find_signal(signal_id).await? {
            Some(signal) => signal,
            None => return Ok(None),
        };
        Ok(Some(format_for_execution(
            &signal,
            amount.unwrap_or(self.config.execution.default_amount),
            expiration_minutes.unwrap_or(self.config.execution.default_expiration_minutes),
        )))
    }

    /// Places a stored signal with the configured broker and reports the
    /// outcome as an `order_execution` alert, filled or not.
    pub async fn execute_signal(
        &self,
        signal_id: Uuid,
        amount: Option<f64>,
        expiration_minutes: Option<u32>,
    ) -> Result<Option<ExecutionOutcome>> {
        let order = match self
            .format_signal(signal_id, amount, expiration_minutes)
            .await?
        {
            Some(order) => order,
            None => return Ok(None),
        };

        let outcome = match self.broker.place(&order).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("❌ {} broker refused {}: {}", self.broker.name(), order.asset, e);
                ExecutionOutcome {
                    order_id: String::new(),
                    broker: self.broker.name().to_string(),
                    success: false,
                    fill_price: None,
                    message: e.to_string(),
                    executed_at: Utc::now(),
                }
            }
        };

        self.notifications
            .submit_execution(execution_alert(&order, &outcome))
            .await;
        Ok(Some(outcome))
    }
}

/// Owns the three pipeline tasks and the shutdown signal they watch.
pub struct TradingOrchestrator {
    context: AppContext,
    driver: Option<TickDriver>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl TradingOrchestrator {
    pub async fn new(config: Config) -> Result<Self> {
        let store = storage::open(&config.storage)
            .await
            .context("failed to open signal store")?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn SignalStore>) -> Result<Self> {
        let metrics = Arc::new(PipelineMetrics::new().context("failed to build metrics")?);
        let health = HealthChecker::new();

        let simulator = PriceSimulator::new(default_instruments(), &config.simulator);
        let (mut driver, feed) = feed::channel(simulator);
        driver.warm_up(config.simulator.warmup_ticks);

        let broadcaster = Broadcaster::new(config.streaming.subscriber_buffer, metrics.clone());
        let notifications = Arc::new(NotificationManager::new(
            store.clone(),
            broadcaster.clone(),
            config.notifications.clone(),
            metrics.clone(),
            health.clone(),
        ));

        let context = AppContext {
            generator: Arc::new(SignalGenerator::new(&config.strategy)),
            broker: build_broker(config.execution.broker),
            config,
            feed,
            store,
            broadcaster,
            notifications,
            metrics,
            health,
        };

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            context,
            driver: Some(driver),
            shutdown_tx,
            tasks: Vec::new(),
        })
    }

    pub fn context(&self) -> AppContext {
        self.context.clone()
    }

    pub async fn start(&mut self) -> Result<()> {
        let driver = self
            .driver
            .take()
            .context("orchestrator already started")?;

        tracing::info!("🚀 Trading Orchestrator starting...");
        let ctx = &self.context;
        ctx.health.update_component("store", true).await;

        let tick_interval = Duration::from_millis(ctx.config.simulator.tick_interval_ms);
        self.tasks.push(tokio::spawn(driver.run(
            tick_interval,
            self.shutdown_tx.subscribe(),
            ctx.metrics.clone(),
            ctx.health.clone(),
        )));

        let monitor = SignalMonitor::new(
            ctx.feed.clone(),
            ctx.generator.clone(),
            ctx.store.clone(),
            ctx.broadcaster.clone(),
            ctx.notifications.clone(),
            ctx.metrics.clone(),
            ctx.health.clone(),
        );
        let monitor_interval = Duration::from_secs(ctx.config.strategy.monitor_interval_secs);
        self.tasks
            .push(tokio::spawn(monitor.run(monitor_interval, self.shutdown_tx.subscribe())));

        let snapshot_interval = Duration::from_secs(ctx.config.streaming.snapshot_interval_secs);
        self.tasks.push(tokio::spawn(ctx.broadcaster.clone().run_snapshots(
            ctx.feed.clone(),
            snapshot_interval,
            self.shutdown_tx.subscribe(),
            ctx.health.clone(),
        )));

        info!("✅ Tick, monitoring and snapshot loops running");
        Ok(())
    }

    /// Signals every task and waits for all of them to exit.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down pipeline...");
        self.shutdown_tx.send_replace(true);
        for result in futures::future::join_all(self.tasks).await {
            if let Err(e) = result {
                error!("❌ Pipeline task ended abnormally: {}", e);
            }
        }
        info!("✅ Pipeline stopped");
    }
}
