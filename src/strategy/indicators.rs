//! Pure indicator functions over price windows.
//!
//! Insufficient history never fails: each function documents the neutral
//! value it returns instead. Two formulas are deliberate simplifications and
//! differ from textbook values:
//! - Stochastic %D is `0.8 * %K` rather than a 3-period average of %K.
//! - The MACD signal line is `0.85 * MACD` rather than a 9-period EMA of MACD;
//!   the histogram is `MACD - signal`.

use serde::{Deserialize, Serialize};

use crate::market::PriceHistory;

pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const ADX_PERIOD: usize = 14;
pub const STOCHASTIC_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_K: f64 = 2.0;
pub const VOLATILITY_PERIOD: usize = 20;

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL_FACTOR: f64 = 0.85;
pub const STOCHASTIC_D_FACTOR: f64 = 0.8;

/// ATR returned when fewer than two closes exist.
pub const ATR_FALLBACK: f64 = 0.01;
/// ADX returned when fewer than `period + 1` points exist.
pub const ADX_NEUTRAL: f64 = 25.0;

pub fn sma(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    prices.iter().sum::<f64>() / prices.len() as f64
}

/// Average gain / average loss over the last `period` deltas.
/// 50.0 with fewer than `period + 1` prices, 100.0 when there was no loss.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in (prices.len() - period)..prices.len() {
        let change = prices[i] - prices[i - 1];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// SMA-seeded EMA; the plain mean when fewer than `period` prices exist.
pub fn ema(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period {
        return sma(prices);
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    prices[period..]
        .iter()
        .fold(sma(&prices[..period]), |ema, price| {
            (price - ema) * multiplier + ema
        })
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Zeros with fewer than 26 prices.
pub fn macd(prices: &[f64]) -> Macd {
    if prices.len() < MACD_SLOW {
        return Macd::default();
    }
    let line = ema(prices, MACD_FAST) - ema(prices, MACD_SLOW);
    let signal = line * MACD_SIGNAL_FACTOR;
    Macd {
        macd: line,
        signal,
        histogram: line - signal,
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// SMA ± `k` population standard deviations of the last `period` prices.
/// With fewer prices the bands are ±2% around the mean of what is there.
pub fn bollinger(prices: &[f64], period: usize, k: f64) -> BollingerBands {
    if period == 0 || prices.len() < period {
        let avg = sma(prices);
        return BollingerBands {
            upper: avg * 1.02,
            middle: avg,
            lower: avg * 0.98,
        };
    }

    let window = &prices[prices.len() - period..];
    let middle = sma(window);
    let variance = window.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / period as f64;
    let std = variance.sqrt();

    BollingerBands {
        upper: middle + k * std,
        middle,
        lower: middle - k * std,
    }
}

fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

/// Mean true range over the last `period` steps (all steps if fewer).
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> f64 {
    let n = highs.len().min(lows.len()).min(closes.len());
    if n < 2 || period == 0 {
        return ATR_FALLBACK;
    }

    let start = n.saturating_sub(period).max(1);
    let ranges: Vec<f64> = (start..n)
        .map(|i| true_range(highs[i], lows[i], closes[i - 1]))
        .collect();
    sma(&ranges)
}

/// Directional-movement index over the last `period` steps, without the
/// textbook smoothing of DX. 0.0 when the window has no directional movement.
pub fn adx(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> f64 {
    let n = highs.len().min(lows.len()).min(closes.len());
    if period == 0 || n < period + 1 {
        return ADX_NEUTRAL;
    }

    let mut plus_dm = 0.0;
    let mut minus_dm = 0.0;
    let mut tr_sum = 0.0;
    for i in (n - period)..n {
        let up = highs[i] - highs[i - 1];
        let down = lows[i - 1] - lows[i];
        if up > down && up > 0.0 {
            plus_dm += up;
        }
        if down > up && down > 0.0 {
            minus_dm += down;
        }
        tr_sum += true_range(highs[i], lows[i], closes[i - 1]);
    }

    if tr_sum <= 0.0 {
        return 0.0;
    }
    let plus_di = 100.0 * plus_dm / tr_sum;
    let minus_di = 100.0 * minus_dm / tr_sum;
    let di_sum = plus_di + minus_di;
    if di_sum <= 0.0 {
        return 0.0;
    }

    (100.0 * (plus_di - minus_di).abs() / di_sum).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

/// %K over the last `period` points (fewer if that is all there is); 50.0
/// when the window has no range.
pub fn stochastic(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Stochastic {
    let n = highs.len().min(lows.len()).min(closes.len());
    if n == 0 || period == 0 {
        return Stochastic {
            k: 50.0,
            d: 50.0 * STOCHASTIC_D_FACTOR,
        };
    }

    let start = n.saturating_sub(period);
    let highest = highs[start..n].iter().copied().fold(f64::MIN, f64::max);
    let lowest = lows[start..n].iter().copied().fold(f64::MAX, f64::min);
    let range = highest - lowest;

    let k = if range > 0.0 {
        ((closes[n - 1] - lowest) / range * 100.0).clamp(0.0, 100.0)
    } else {
        50.0
    };

    Stochastic {
        k,
        d: k * STOCHASTIC_D_FACTOR,
    }
}

/// Coefficient of variation (std / mean) of the last `period` prices.
pub fn volatility(prices: &[f64], period: usize) -> f64 {
    let window = &prices[prices.len().saturating_sub(period)..];
    if window.len() < 2 {
        return 0.0;
    }
    let mean = sma(window);
    if mean == 0.0 {
        return 0.0;
    }
    let variance = window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / window.len() as f64;
    variance.sqrt() / mean
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub stoch_k: f64,
    pub stoch_d: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub ema_9: f64,
    pub ema_21: f64,
    pub ema_200: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub atr: f64,
    pub adx: f64,
    pub volatility: f64,
    pub price: f64,
}

impl IndicatorSnapshot {
    pub fn compute(closes: &[f64], highs: &[f64], lows: &[f64]) -> Self {
        let macd = macd(closes);
        let bands = bollinger(closes, BOLLINGER_PERIOD, BOLLINGER_K);
        let stoch = stochastic(highs, lows, closes, STOCHASTIC_PERIOD);

        Self {
            rsi: rsi(closes, RSI_PERIOD),
            stoch_k: stoch.k,
            stoch_d: stoch.d,
            macd: macd.macd,
            macd_signal: macd.signal,
            macd_histogram: macd.histogram,
            ema_9: ema(closes, 9),
            ema_21: ema(closes, 21),
            ema_200: ema(closes, 200),
            bb_upper: bands.upper,
            bb_middle: bands.middle,
            bb_lower: bands.lower,
            atr: atr(highs, lows, closes, ATR_PERIOD),
            adx: adx(highs, lows, closes, ADX_PERIOD),
            volatility: volatility(closes, VOLATILITY_PERIOD),
            price: closes.last().copied().unwrap_or(0.0),
        }
    }

    pub fn from_history(history: &PriceHistory) -> Self {
        Self::compute(&history.closes(), &history.highs(), &history.lows())
    }
}
