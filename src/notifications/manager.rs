use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use super::alert::{build_alert, Alert};
use super::settings::{should_notify, NotificationSettings};
use crate::core::{HealthChecker, PipelineMetrics};
use crate::storage::SignalStore;
use crate::streaming::{Broadcaster, Event};
use crate::strategy::Signal;

/// Per-instrument sliding window over alert timestamps.
#[derive(Default)]
pub struct AlertRateLimiter {
    sent: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl AlertRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records and allows the alert unless `max` alerts already went out for
    /// `symbol` within `window`.
    pub async fn try_acquire(
        &self,
        symbol: &str,
        max: usize,
        window: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        let mut sent = self.sent.lock().await;
        let times = sent.entry(symbol.to_string()).or_default();

        let window_start = now - window;
        while let Some(&front) = times.front() {
            if front <= window_start {
                times.pop_front();
            } else {
                break;
            }
        }

        if times.len() >= max {
            return false;
        }
        times.push_back(now);
        true
    }
}

/// Turns accepted signals into alerts, then persists and broadcasts them.
/// Neither side effect can fail the call.
pub struct NotificationManager {
    store: Arc<dyn SignalStore>,
    broadcaster: Broadcaster,
    settings: RwLock<NotificationSettings>,
    limiter: AlertRateLimiter,
    metrics: Arc<PipelineMetrics>,
    health: HealthChecker,
}

impl NotificationManager {
    pub fn new(
        store: Arc<dyn SignalStore>,
        broadcaster: Broadcaster,
        settings: NotificationSettings,
        metrics: Arc<PipelineMetrics>,
        health: HealthChecker,
    ) -> Self {
        Self {
            store,
            broadcaster,
            settings: RwLock::new(settings),
            limiter: AlertRateLimiter::new(),
            metrics,
            health,
        }
    }

    pub async fn settings(&self) -> NotificationSettings {
        self.settings.read().await.clone()
    }

    pub async fn update_settings(&self, settings: NotificationSettings) {
        info!(
            "🔔 Notification settings updated (enabled: {}, min confidence: {:.0})",
            settings.enabled, settings.min_confidence
        );
        *self.settings.write().await = settings;
    }

    /// `process` against the current settings.
    pub async fn notify(&self, signal: &Signal) -> Option<Alert> {
        let settings = self.settings().await;
        self.process(signal, &settings).await
    }

    pub async fn process(&self, signal: &Signal, settings: &NotificationSettings) -> Option<Alert> {
        if !should_notify(signal, settings) {
            debug!(
                "🔕 {} {} filtered by notification policy",
                signal.symbol, signal.direction
            );
            self.metrics.alerts_suppressed.inc();
            return None;
        }

        let window = Duration::minutes(i64::from(settings.rate_limit_window_minutes));
        let allowed = self
            .limiter
            .try_acquire(
                &signal.symbol,
                settings.max_alerts_per_instrument,
                window,
                Utc::now(),
            )
            .await;
        if !allowed {
            info!(
                "⏳ Alert for {} rate limited ({} per {}m)",
                signal.symbol, settings.max_alerts_per_instrument, settings.rate_limit_window_minutes
            );
            self.metrics.alerts_suppressed.inc();
            return None;
        }

        let alert = build_alert(signal);
        self.deliver(&alert).await;
        Some(alert)
    }

    /// Entry point for execution outcomes produced outside the pipeline.
    pub async fn submit_execution(&self, alert: Alert) {
        self.deliver(&alert).await;
    }

    async fn deliver(&self, alert: &Alert) {
        match self.store.save_alert(alert).await {
            Ok(()) => self.health.update_component("store", true).await,
            Err(e) => {
                error!("❌ Failed to persist alert {}: {}", alert.id, e);
                self.metrics.store_failures.inc();
                self.health.update_component("store", false).await;
            }
        }

        let delivered = self
            .broadcaster
            .publish(&Event::TradingAlert(alert.clone()))
            .await;
        self.metrics.alerts_delivered.inc();
        info!(
            "🔔 {} [{}] sent to {} subscriber(s)",
            alert.title,
            alert.priority.as_str(),
            delivered
        );
    }
}
