use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::history::{PriceHistory, PriceTick};
use super::instruments::Instrument;
use crate::core::config::SimulatorConfig;
use crate::core::SimulationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

impl Trend {
    const ALL: [Trend; 3] = [Trend::Uptrend, Trend::Downtrend, Trend::Sideways];

    /// Per-tick drift range.
    pub fn drift_range(&self) -> (f64, f64) {
        match self {
            Trend::Uptrend => (0.0001, 0.0005),
            Trend::Downtrend => (-0.0005, -0.0001),
            Trend::Sideways => (-0.0001, 0.0001),
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Uptrend => write!(f, "uptrend"),
            Trend::Downtrend => write!(f, "downtrend"),
            Trend::Sideways => write!(f, "sideways"),
        }
    }
}

/// Global volatility regime shared by every instrument.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityRegime {
    Low,
    Normal,
    High,
}

impl VolatilityRegime {
    const ALL: [VolatilityRegime; 3] = [
        VolatilityRegime::Low,
        VolatilityRegime::Normal,
        VolatilityRegime::High,
    ];

    pub fn multiplier(&self) -> f64 {
        match self {
            VolatilityRegime::Low => 0.5,
            VolatilityRegime::Normal => 1.0,
            VolatilityRegime::High => 2.0,
        }
    }
}

impl fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolatilityRegime::Low => write!(f, "low"),
            VolatilityRegime::Normal => write!(f, "normal"),
            VolatilityRegime::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketState {
    pub prices: HashMap<String, f64>,
    pub trends: HashMap<String, Trend>,
    pub volatility_regime: VolatilityRegime,
}

impl MarketState {
    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    pub fn trend(&self, symbol: &str) -> Trend {
        self.trends.get(symbol).copied().unwrap_or(Trend::Sideways)
    }
}

/// Immutable copy of the whole market taken right after a tick. Histories are
/// shared with the simulator until its next write to that instrument.
#[derive(Debug, Clone)]
pub struct MarketView {
    pub instruments: Arc<[Instrument]>,
    pub state: MarketState,
    pub histories: HashMap<String, Arc<PriceHistory>>,
    pub taken_at: DateTime<Utc>,
}

impl MarketView {
    pub fn history(&self, symbol: &str) -> Option<&PriceHistory> {
        self.histories.get(symbol).map(|h| h.as_ref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    pub updated: usize,
    pub faults: usize,
}

pub struct PriceSimulator {
    instruments: Arc<[Instrument]>,
    state: MarketState,
    histories: HashMap<String, Arc<PriceHistory>>,
    rng: StdRng,
    trend_flip_probability: f64,
    regime_flip_probability: f64,
    mean_reversion_strength: f64,
}

impl PriceSimulator {
    pub fn new(instruments: Vec<Instrument>, config: &SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut prices = HashMap::new();
        let mut trends = HashMap::new();
        let mut histories = HashMap::new();
        for instrument in &instruments {
            prices.insert(instrument.symbol.clone(), instrument.base_price);
            trends.insert(instrument.symbol.clone(), Trend::Sideways);
            histories.insert(
                instrument.symbol.clone(),
                Arc::new(PriceHistory::new(config.history_capacity)),
            );
        }

        info!(
            "🧪 Price simulator ready: {} instruments, history capacity {}",
            instruments.len(),
            config.history_capacity
        );

        Self {
            instruments: instruments.into(),
            state: MarketState {
                prices,
                trends,
                volatility_regime: VolatilityRegime::Normal,
            },
            histories,
            rng,
            trend_flip_probability: config.trend_flip_probability,
            regime_flip_probability: config.regime_flip_probability,
            mean_reversion_strength: config.mean_reversion_strength,
        }
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn set_trend(&mut self, symbol: &str, trend: Trend) -> Result<(), SimulationError> {
        match self.state.trends.get_mut(symbol) {
            Some(current) => {
                *current = trend;
                Ok(())
            }
            None => Err(SimulationError::UnknownInstrument(symbol.to_string())),
        }
    }

    pub fn set_volatility_regime(&mut self, regime: VolatilityRegime) {
        self.state.volatility_regime = regime;
    }

    /// One price step for every instrument. A failing instrument is logged
    /// and skipped; the others still advance.
    pub fn advance(&mut self) -> AdvanceReport {
        let now = Utc::now();
        let mut report = AdvanceReport::default();

        if self.rng.gen_bool(self.regime_flip_probability) {
            let next = VolatilityRegime::ALL[self.rng.gen_range(0..VolatilityRegime::ALL.len())];
            if next != self.state.volatility_regime {
                debug!(
                    "🌪️ Volatility regime shift: {} -> {}",
                    self.state.volatility_regime, next
                );
            }
            self.state.volatility_regime = next;
        }
        let regime = self.state.volatility_regime;

        for instrument in self.instruments.iter() {
            let symbol = &instrument.symbol;

            if self.rng.gen_bool(self.trend_flip_probability) {
                let next = Trend::ALL[self.rng.gen_range(0..Trend::ALL.len())];
                self.state.trends.insert(symbol.clone(), next);
            }

            let current = self
                .state
                .prices
                .get(symbol)
                .copied()
                .unwrap_or(instrument.base_price);
            let trend = self.state.trend(symbol);

            match Self::step(
                &mut self.rng,
                instrument,
                current,
                trend,
                regime,
                self.mean_reversion_strength,
                now,
            ) {
                Ok(tick) => {
                    self.state.prices.insert(symbol.clone(), tick.price);
                    if let Some(history) = self.histories.get_mut(symbol) {
                        Arc::make_mut(history).push(tick);
                    }
                    report.updated += 1;
                }
                Err(e) => {
                    warn!("⚠️  Skipping {} this tick: {}", symbol, e);
                    report.faults += 1;
                }
            }
        }

        report
    }

    fn step(
        rng: &mut StdRng,
        instrument: &Instrument,
        current: f64,
        trend: Trend,
        regime: VolatilityRegime,
        mean_reversion_strength: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<PriceTick, SimulationError> {
        let base = instrument.base_price;
        let sigma = instrument.base_volatility * regime.multiplier();
        let noise = Normal::new(0.0, sigma)
            .map_err(|_| SimulationError::InvalidVolatility {
                symbol: instrument.symbol.clone(),
                volatility: instrument.base_volatility,
            })?
            .sample(rng);

        let (drift_lo, drift_hi) = trend.drift_range();
        let drift = rng.gen_range(drift_lo..=drift_hi);
        let mean_reversion = -((current - base) / base) * mean_reversion_strength;

        let raw = current * (1.0 + drift + mean_reversion + noise);
        if !raw.is_finite() || !base.is_finite() || base <= 0.0 {
            return Err(SimulationError::NonFinitePrice {
                symbol: instrument.symbol.clone(),
            });
        }
        let price = raw.clamp(0.7 * base, 1.5 * base);

        let (volume_lo, volume_hi) = instrument.class.volume_range();
        let volume = rng.gen_range(volume_lo..volume_hi);
        let high = price * (1.0 + rng.gen::<f64>() * sigma);
        let low = price * (1.0 - rng.gen::<f64>() * sigma);

        Ok(PriceTick {
            price,
            timestamp,
            volume,
            high,
            low,
        })
    }

    /// Copy of one instrument's history.
    pub fn snapshot(&self, symbol: &str) -> Option<PriceHistory> {
        self.histories.get(symbol).map(|h| h.as_ref().clone())
    }

    pub fn current_state(&self) -> MarketState {
        self.state.clone()
    }

    pub fn view(&self) -> MarketView {
        MarketView {
            instruments: self.instruments.clone(),
            state: self.state.clone(),
            histories: self.histories.clone(),
            taken_at: Utc::now(),
        }
    }
}
