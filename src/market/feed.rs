use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use super::history::PriceHistory;
use super::instruments::Instrument;
use super::simulator::{AdvanceReport, MarketState, MarketView, PriceSimulator};
use crate::core::{HealthChecker, PipelineMetrics};

/// Read side of the simulator: every clone observes the latest published view.
#[derive(Clone)]
pub struct MarketFeed {
    rx: watch::Receiver<Arc<MarketView>>,
}

impl MarketFeed {
    pub fn view(&self) -> Arc<MarketView> {
        self.rx.borrow().clone()
    }

    pub fn history(&self, symbol: &str) -> Option<PriceHistory> {
        self.view().history(symbol).cloned()
    }

    pub fn state(&self) -> MarketState {
        self.view().state.clone()
    }

    pub fn instruments(&self) -> Arc<[Instrument]> {
        self.view().instruments.clone()
    }

    /// Waits until the tick task publishes a newer view.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Write side: the only owner of the simulator.
pub struct TickDriver {
    simulator: PriceSimulator,
    tx: watch::Sender<Arc<MarketView>>,
}

pub fn channel(simulator: PriceSimulator) -> (TickDriver, MarketFeed) {
    let (tx, rx) = watch::channel(Arc::new(simulator.view()));
    (TickDriver { simulator, tx }, MarketFeed { rx })
}

impl TickDriver {
    pub fn simulator_mut(&mut self) -> &mut PriceSimulator {
        &mut self.simulator
    }

    /// Advances once and publishes the new view.
    pub fn tick(&mut self) -> AdvanceReport {
        let report = self.simulator.advance();
        self.tx.send_replace(Arc::new(self.simulator.view()));
        report
    }

    pub fn warm_up(&mut self, ticks: usize) {
        if ticks == 0 {
            return;
        }
        for _ in 0..ticks {
            self.simulator.advance();
        }
        self.tx.send_replace(Arc::new(self.simulator.view()));
        info!("🔥 Warm-up complete: {} ticks pre-generated", ticks);
    }

    pub async fn run(
        mut self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
        metrics: Arc<PipelineMetrics>,
        health: HealthChecker,
    ) {
        info!("⏱️  Tick loop started ({}ms interval)", interval.as_millis());
        health.update_component("simulator", true).await;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick();
                    metrics.ticks.inc_by(report.updated as u64);
                    if report.faults > 0 {
                        metrics.tick_faults.inc_by(report.faults as u64);
                        warn!("⚠️  {} instrument(s) skipped this tick", report.faults);
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        health.update_component("simulator", false).await;
        info!("🛑 Tick loop stopped");
    }
}
