use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Crypto,
    Forex,
    Index,
}

impl AssetClass {
    /// Uniform per-tick volume range.
    pub fn volume_range(&self) -> (f64, f64) {
        match self {
            AssetClass::Crypto => (1_000.0, 50_000.0),
            AssetClass::Forex => (100_000.0, 1_000_000.0),
            AssetClass::Index => (10_000.0, 200_000.0),
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Crypto => write!(f, "crypto"),
            AssetClass::Forex => write!(f, "forex"),
            AssetClass::Index => write!(f, "index"),
        }
    }
}

/// Static per-run configuration of one simulated market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub class: AssetClass,
    pub base_price: f64,
    /// Standard deviation of the per-tick return under the normal regime.
    pub base_volatility: f64,
}

impl Instrument {
    pub fn new(symbol: &str, class: AssetClass, base_price: f64, base_volatility: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            class,
            base_price,
            base_volatility,
        }
    }

    pub fn display_symbol(&self) -> String {
        display_symbol(&self.symbol)
    }
}

pub fn default_instruments() -> Vec<Instrument> {
    vec![
        Instrument::new("BTCUSDT", AssetClass::Crypto, 43_000.0, 0.0015),
        Instrument::new("ETHUSDT", AssetClass::Crypto, 2_600.0, 0.0020),
        Instrument::new("BNBUSDT", AssetClass::Crypto, 310.0, 0.0018),
        Instrument::new("EURUSD", AssetClass::Forex, 1.085, 0.0003),
        Instrument::new("GBPUSD", AssetClass::Forex, 1.27, 0.0004),
        Instrument::new("USDJPY", AssetClass::Forex, 149.5, 0.0003),
    ]
}

const QUOTE_CURRENCIES: [&str; 3] = ["USDT", "USDC", "BUSD"];

/// `BTCUSDT` -> `BTC/USDT`, `EURUSD` -> `EUR/USD`; anything else unchanged.
pub fn display_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();

    for quote in QUOTE_CURRENCIES {
        if let Some(base) = upper.strip_suffix(quote) {
            if !base.is_empty() {
                return format!("{}/{}", base, quote);
            }
        }
    }

    if upper.len() == 6 && upper.chars().all(|c| c.is_ascii_alphabetic()) {
        return format!("{}/{}", &upper[..3], &upper[3..]);
    }

    upper
}
