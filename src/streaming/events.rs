use serde::Serialize;

use crate::market::{AssetClass, MarketView, Trend};
use crate::notifications::Alert;
use crate::strategy::Signal;

/// Number of ticks the snapshot "change" looks back over.
pub const CHANGE_PERIODS: usize = 24;

/// Wire envelope: `{"type": "...", "data": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    MarketUpdate(Vec<TickerSnapshot>),
    NewSignal(Signal),
    TradingAlert(Alert),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::MarketUpdate(_) => "market_update",
            Event::NewSignal(_) => "new_signal",
            Event::TradingAlert(_) => "trading_alert",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TickerSnapshot {
    pub symbol: String,
    pub price: f64,
    /// Percent change over the last `CHANGE_PERIODS` ticks.
    pub change: f64,
    pub volume: f64,
    pub class: AssetClass,
    pub trend: Trend,
}

/// One ticker per instrument that has at least one tick, in table order.
pub fn market_snapshot(view: &MarketView) -> Vec<TickerSnapshot> {
    view.instruments
        .iter()
        .filter_map(|instrument| {
            let history = view.history(&instrument.symbol)?;
            let latest = history.latest()?;
            Some(TickerSnapshot {
                symbol: instrument.symbol.clone(),
                price: latest.price,
                change: history.change_pct(CHANGE_PERIODS),
                volume: latest.volume,
                class: instrument.class,
                trend: view.state.trend(&instrument.symbol),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulatorConfig;
    use crate::market::{default_instruments, PriceSimulator};
    use crate::notifications::alert::fixtures;

    #[test]
    fn test_envelope_shape() {
        let event = Event::NewSignal(fixtures::signal("BTCUSDT", 77.0));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "new_signal");
        assert_eq!(json["data"]["symbol"], "BTCUSDT");
        assert_eq!(json["data"]["direction"], "BUY");
        assert_eq!(event.kind(), "new_signal");
    }

    #[test]
    fn test_snapshot_covers_every_instrument() {
        let config = SimulatorConfig {
            seed: Some(3),
            ..Default::default()
        };
        let mut sim = PriceSimulator::new(default_instruments(), &config);
        assert!(market_snapshot(&sim.view()).is_empty());

        for _ in 0..30 {
            sim.advance();
        }
        let view = sim.view();
        let tickers = market_snapshot(&view);
        assert_eq!(tickers.len(), default_instruments().len());
        assert_eq!(tickers[0].symbol, "BTCUSDT");
        assert_eq!(Some(tickers[0].price), view.state.price("BTCUSDT"));

        let json = serde_json::to_value(Event::MarketUpdate(tickers)).unwrap();
        assert_eq!(json["type"], "market_update");
        assert_eq!(json["data"][0]["class"], "crypto");
    }
}
