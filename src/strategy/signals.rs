use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::indicators::IndicatorSnapshot;
use super::regime::MarketRegime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.0 {
            Direction::Buy
        } else {
            Direction::Sell
        }
    }

    /// +1 for BUY, -1 for SELL.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SignalQuality {
    Normal,
    High,
    Premium,
}

impl SignalQuality {
    pub fn from_points(points: u32) -> Self {
        if points >= 5 {
            SignalQuality::Premium
        } else if points >= 3 {
            SignalQuality::High
        } else {
            SignalQuality::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
}

impl Timeframe {
    /// Faster timeframes for stronger setups.
    pub fn for_confidence(confidence: f64) -> Self {
        if confidence >= 85.0 {
            Timeframe::M1
        } else if confidence >= 70.0 {
            Timeframe::M5
        } else {
            Timeframe::M15
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "1m" => Some(Timeframe::M1),
            "5m" => Some(Timeframe::M5),
            "15m" => Some(Timeframe::M15),
            _ => None,
        }
    }

    pub fn minutes(&self) -> u32 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive only; nothing in the pipeline transitions it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalStatus {
    Active,
}

/// A scored recommendation. Built once by the generator and only shared
/// behind `&`/`Arc` afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub id: Uuid,
    pub symbol: String,
    pub direction: Direction,
    pub confidence: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward_ratio: f64,
    pub regime: MarketRegime,
    pub quality: SignalQuality,
    pub timeframe: Timeframe,
    pub justification: String,
    pub indicators: IndicatorSnapshot,
    pub created_at: DateTime<Utc>,
    pub status: SignalStatus,
}

/// Stop/target pair at `stop_mult`/`target_mult` ATRs from the entry.
pub fn risk_levels(
    direction: Direction,
    entry: f64,
    atr: f64,
    stop_mult: f64,
    target_mult: f64,
) -> (f64, f64) {
    match direction {
        Direction::Buy => (entry - stop_mult * atr, entry + target_mult * atr),
        Direction::Sell => (entry + stop_mult * atr, entry - target_mult * atr),
    }
}

/// `|target - entry| / |entry - stop|`; NaN when the stop equals the entry.
pub fn risk_reward(entry: f64, stop: f64, target: f64) -> f64 {
    let risk = (entry - stop).abs();
    if risk == 0.0 {
        return f64::NAN;
    }
    (target - entry).abs() / risk
}
