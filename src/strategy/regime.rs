use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_REGIME_HISTORY: usize = 50;
pub const TREND_LOOKBACK: usize = 20;
pub const TREND_THRESHOLD: f64 = 0.02;
pub const HIGH_VOLATILITY: f64 = 0.03;
pub const LOW_VOLATILITY: f64 = 0.01;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    Trending,
    Sideways,
    HighVol,
    LowVol,
}

impl MarketRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketRegime::Trending => "trending",
            MarketRegime::Sideways => "sideways",
            MarketRegime::HighVol => "high_vol",
            MarketRegime::LowVol => "low_vol",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trending" => Some(MarketRegime::Trending),
            "sideways" => Some(MarketRegime::Sideways),
            "high_vol" => Some(MarketRegime::HighVol),
            "low_vol" => Some(MarketRegime::LowVol),
            _ => None,
        }
    }
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fractional change over the last `TREND_LOOKBACK` points.
pub fn trend_strength(prices: &[f64]) -> f64 {
    if prices.len() < TREND_LOOKBACK {
        return 0.0;
    }
    let start = prices[prices.len() - TREND_LOOKBACK];
    let end = prices[prices.len() - 1];
    if start == 0.0 {
        return 0.0;
    }
    (end - start) / start
}

/// Trend first, then volatility extremes; sideways with fewer than 50 prices.
pub fn classify(prices: &[f64], volatility: f64) -> MarketRegime {
    if prices.len() < MIN_REGIME_HISTORY {
        return MarketRegime::Sideways;
    }

    if trend_strength(prices).abs() > TREND_THRESHOLD {
        MarketRegime::Trending
    } else if volatility > HIGH_VOLATILITY {
        MarketRegime::HighVol
    } else if volatility < LOW_VOLATILITY {
        MarketRegime::LowVol
    } else {
        MarketRegime::Sideways
    }
}
