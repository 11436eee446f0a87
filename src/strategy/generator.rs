use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::indicators::IndicatorSnapshot;
use super::regime::{self, MarketRegime};
use super::signals::{
    risk_levels, risk_reward, Direction, Signal, SignalQuality, SignalStatus, Timeframe,
};
use crate::core::config::StrategyConfig;
use crate::market::{PriceHistory, VolatilityRegime};

pub const TREND_WEIGHT: f64 = 0.25;
pub const MOMENTUM_WEIGHT: f64 = 0.30;
pub const VOLATILITY_WEIGHT: f64 = 0.25;
pub const REGIME_WEIGHT: f64 = 0.20;

/// Signed sub-scores: positive values argue for BUY, negative for SELL.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ScoreBreakdown {
    pub trend: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub regime_bonus: f64,
    pub factors: Vec<String>,
}

impl ScoreBreakdown {
    pub fn composite(&self) -> f64 {
        TREND_WEIGHT * self.trend
            + MOMENTUM_WEIGHT * self.momentum
            + VOLATILITY_WEIGHT * self.volatility
            + REGIME_WEIGHT * self.regime_bonus
    }

    /// The direction the weighted scores point to.
    pub fn direction(&self) -> Direction {
        Direction::from_score(self.composite())
    }

    /// `50 + weighted sum`, with every sub-score oriented towards the chosen
    /// direction, which is `50 + |composite|`.
    pub fn confidence(&self) -> f64 {
        (50.0 + self.composite().abs()).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub indicators: IndicatorSnapshot,
    pub regime: MarketRegime,
    pub scores: ScoreBreakdown,
}

#[derive(Debug, Clone)]
pub enum Evaluation {
    Emitted(Signal),
    InsufficientHistory { have: usize, need: usize },
    BelowConfidence { confidence: f64 },
    BelowRiskReward { risk_reward: f64 },
}

impl Evaluation {
    pub fn into_signal(self) -> Option<Signal> {
        match self {
            Evaluation::Emitted(signal) => Some(signal),
            _ => None,
        }
    }

    /// True when a setup was scored and then rejected by a gate.
    pub fn is_discard(&self) -> bool {
        matches!(
            self,
            Evaluation::BelowConfidence { .. } | Evaluation::BelowRiskReward { .. }
        )
    }
}

pub struct SignalGenerator {
    min_history: usize,
    min_confidence: f64,
    min_risk_reward: f64,
    stop_atr_multiplier: f64,
    target_atr_multiplier: f64,
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self::new(&StrategyConfig::default())
    }
}

impl SignalGenerator {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            min_history: config.min_history,
            min_confidence: config.min_confidence,
            min_risk_reward: config.min_risk_reward,
            stop_atr_multiplier: config.stop_atr_multiplier,
            target_atr_multiplier: config.target_atr_multiplier,
        }
    }

    pub fn min_risk_reward(&self) -> f64 {
        self.min_risk_reward
    }

    /// Indicators, regime and sub-scores for whatever history is available.
    pub fn analyze(&self, history: &PriceHistory) -> Analysis {
        let closes = history.closes();
        let indicators = IndicatorSnapshot::compute(&closes, &history.highs(), &history.lows());
        let regime = regime::classify(&closes, indicators.volatility);

        let mut factors = Vec::new();
        let trend = Self::trend_score(&indicators, &mut factors);
        let momentum = Self::momentum_score(&indicators, &mut factors);
        let volatility = Self::level_score(&indicators, &mut factors);
        let regime_bonus = Self::regime_bonus(regime, trend, momentum, volatility, &mut factors);

        Analysis {
            indicators,
            regime,
            scores: ScoreBreakdown {
                trend,
                momentum,
                volatility,
                regime_bonus,
                factors,
            },
        }
    }

    pub fn generate(
        &self,
        symbol: &str,
        history: &PriceHistory,
        global_regime: VolatilityRegime,
    ) -> Option<Signal> {
        self.evaluate(symbol, history, global_regime).into_signal()
    }

    pub fn evaluate(
        &self,
        symbol: &str,
        history: &PriceHistory,
        global_regime: VolatilityRegime,
    ) -> Evaluation {
        if history.len() < self.min_history {
            return Evaluation::InsufficientHistory {
                have: history.len(),
                need: self.min_history,
            };
        }

        let analysis = self.analyze(history);
        let direction = analysis.scores.direction();
        let confidence = analysis.scores.confidence();
        if confidence < self.min_confidence {
            debug!(
                "⏸️  {} {} confidence too low: {:.1}",
                symbol, direction, confidence
            );
            return Evaluation::BelowConfidence { confidence };
        }

        let ind = &analysis.indicators;
        let entry = ind.price;
        let (stop_loss, take_profit) = risk_levels(
            direction,
            entry,
            ind.atr,
            self.stop_atr_multiplier,
            self.target_atr_multiplier,
        );
        let rr = risk_reward(entry, stop_loss, take_profit);
        if !rr.is_finite() || rr < self.min_risk_reward {
            debug!("⏸️  {} {} risk-reward too low: {:.2}", symbol, direction, rr);
            return Evaluation::BelowRiskReward { risk_reward: rr };
        }

        let quality = Self::quality(ind, direction, global_regime);
        let justification = format!(
            "{} {} | confidence {:.1} | regime {} | global volatility {} | {}",
            direction,
            symbol,
            confidence,
            analysis.regime,
            global_regime,
            analysis.scores.factors.join(", ")
        );

        Evaluation::Emitted(Signal {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            direction,
            confidence,
            entry_price: entry,
            stop_loss,
            take_profit,
            risk_reward_ratio: rr,
            regime: analysis.regime,
            quality,
            timeframe: Timeframe::for_confidence(confidence),
            justification,
            indicators: analysis.indicators,
            created_at: Utc::now(),
            status: SignalStatus::Active,
        })
    }

    /// EMA 9/21/200 alignment plus an ADX bonus in the prevailing direction.
    fn trend_score(ind: &IndicatorSnapshot, factors: &mut Vec<String>) -> f64 {
        let mut score: f64 = 0.0;

        if ind.ema_9 > ind.ema_21 {
            score += 30.0;
            factors.push("EMA9 above EMA21".to_string());
        } else if ind.ema_9 < ind.ema_21 {
            score -= 30.0;
            factors.push("EMA9 below EMA21".to_string());
        }

        if ind.ema_21 > ind.ema_200 {
            score += 30.0;
            factors.push("EMA21 above EMA200".to_string());
        } else if ind.ema_21 < ind.ema_200 {
            score -= 30.0;
            factors.push("EMA21 below EMA200".to_string());
        }

        if ind.price > ind.ema_200 {
            score += 20.0;
        } else if ind.price < ind.ema_200 {
            score -= 20.0;
        }

        if ind.adx > 25.0 && score != 0.0 {
            score += 20.0 * score.signum();
            factors.push(format!("strong trend (ADX {:.0})", ind.adx));
        }

        score
    }

    /// RSI and stochastic extremes (contrarian), MACD sign agreement
    /// (with the move).
    fn momentum_score(ind: &IndicatorSnapshot, factors: &mut Vec<String>) -> f64 {
        let mut score = 0.0;

        if ind.rsi < 30.0 {
            score += 40.0;
            factors.push(format!("RSI oversold ({:.0})", ind.rsi));
        } else if ind.rsi > 70.0 {
            score -= 40.0;
            factors.push(format!("RSI overbought ({:.0})", ind.rsi));
        }

        if ind.stoch_k < 20.0 {
            score += 20.0;
            factors.push(format!("stochastic oversold ({:.0})", ind.stoch_k));
        } else if ind.stoch_k > 80.0 {
            score -= 20.0;
            factors.push(format!("stochastic overbought ({:.0})", ind.stoch_k));
        }

        if ind.macd > 0.0 && ind.macd_histogram > 0.0 {
            score += 30.0;
            factors.push("MACD bullish".to_string());
        } else if ind.macd < 0.0 && ind.macd_histogram < 0.0 {
            score -= 30.0;
            factors.push("MACD bearish".to_string());
        }

        score
    }

    /// Band touches score ±50; inside the bands the score leans against the
    /// position within them.
    fn level_score(ind: &IndicatorSnapshot, factors: &mut Vec<String>) -> f64 {
        if ind.price <= ind.bb_lower {
            factors.push("price at lower Bollinger band".to_string());
            return 50.0;
        }
        if ind.price >= ind.bb_upper {
            factors.push("price at upper Bollinger band".to_string());
            return -50.0;
        }

        let width = ind.bb_upper - ind.bb_lower;
        if width <= 0.0 {
            return 0.0;
        }
        let position = (ind.price - ind.bb_lower) / width;
        -(position - 0.5) * 40.0
    }

    fn regime_bonus(
        regime: MarketRegime,
        trend: f64,
        momentum: f64,
        levels: f64,
        factors: &mut Vec<String>,
    ) -> f64 {
        match regime {
            MarketRegime::Trending if trend != 0.0 => {
                if momentum == 0.0 || momentum.signum() == trend.signum() {
                    factors.push("trend confirmed by trending regime".to_string());
                    let strength = if momentum == 0.0 { 25.0 } else { 50.0 };
                    strength * trend.signum()
                } else {
                    0.0
                }
            }
            MarketRegime::Sideways | MarketRegime::LowVol if levels.abs() >= 50.0 => {
                factors.push("range reversal setup".to_string());
                30.0 * levels.signum()
            }
            _ => 0.0,
        }
    }

    /// Points for RSI extremity, MACD/histogram agreement and a band touch,
    /// all measured in the signal's direction. A high global volatility
    /// regime caps the label at `High`.
    fn quality(
        ind: &IndicatorSnapshot,
        direction: Direction,
        global_regime: VolatilityRegime,
    ) -> SignalQuality {
        let mut points = 0;

        let rsi_extreme = match direction {
            Direction::Buy => ind.rsi < 30.0,
            Direction::Sell => ind.rsi > 70.0,
        };
        if rsi_extreme {
            points += 2;
            if ind.rsi < 20.0 || ind.rsi > 80.0 {
                points += 1;
            }
        }

        let sign = direction.sign();
        if ind.macd * sign > 0.0 && ind.macd_histogram * sign > 0.0 {
            points += 2;
        }

        let band_touch = match direction {
            Direction::Buy => ind.price <= ind.bb_lower,
            Direction::Sell => ind.price >= ind.bb_upper,
        };
        if band_touch {
            points += 2;
        }

        let quality = SignalQuality::from_points(points);
        if global_regime == VolatilityRegime::High {
            quality.min(SignalQuality::High)
        } else {
            quality
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulatorConfig;
    use crate::market::{AssetClass, Instrument, PriceSimulator, PriceTick, Trend};

    fn steady_config() -> SimulatorConfig {
        SimulatorConfig {
            seed: Some(1234),
            trend_flip_probability: 0.0,
            regime_flip_probability: 0.0,
            mean_reversion_strength: 0.0,
            ..Default::default()
        }
    }

    /// Noise-free simulator run in a fixed trend.
    fn steady_series(trend: Trend, ticks: usize) -> PriceHistory {
        let instrument = Instrument::new("TEST", AssetClass::Crypto, 1_000.0, 0.0);
        let mut sim = PriceSimulator::new(vec![instrument], &steady_config());
        sim.set_trend("TEST", trend).unwrap();
        for _ in 0..ticks {
            sim.advance();
        }
        sim.snapshot("TEST").unwrap()
    }

    fn history_from(closes: &[f64]) -> PriceHistory {
        PriceHistory::from_ticks(
            500,
            closes.iter().map(|&price| PriceTick {
                price,
                timestamp: Utc::now(),
                volume: 1.0,
                high: price * 1.001,
                low: price * 0.999,
            }),
        )
    }

    #[test]
    fn test_rising_series_aligns_emas_and_trend_score() {
        let history = steady_series(Trend::Uptrend, 150);
        let closes = history.closes();
        assert!(closes.windows(2).all(|w| w[1] > w[0]));

        let analysis = SignalGenerator::default().analyze(&history);
        let ind = &analysis.indicators;
        assert!(ind.ema_9 > ind.ema_21);
        assert!(ind.ema_21 > ind.ema_200);
        assert!(analysis.scores.trend > 0.0);
        assert_eq!(analysis.scores.direction(), Direction::Buy);
    }

    #[test]
    fn test_direction_follows_composite_score() {
        let generator = SignalGenerator::default();

        let falling = steady_series(Trend::Downtrend, 150);
        let analysis = generator.analyze(&falling);
        assert!(analysis.scores.trend < 0.0);
        assert_eq!(analysis.scores.direction(), Direction::Sell);

        for history in [falling, steady_series(Trend::Uptrend, 150)] {
            let expected = generator.analyze(&history).scores.direction();
            if let Some(signal) = generator.generate("TEST", &history, VolatilityRegime::Normal) {
                assert_eq!(signal.direction, expected);
            }
        }
    }

    #[test]
    fn test_requires_minimum_history() {
        let history = steady_series(Trend::Uptrend, 99);
        let evaluation =
            SignalGenerator::default().evaluate("TEST", &history, VolatilityRegime::Normal);
        assert!(matches!(
            evaluation,
            Evaluation::InsufficientHistory { have: 99, need: 100 }
        ));
    }

    #[test]
    fn test_emitted_signals_respect_gates() {
        let generator = SignalGenerator::default();
        let mut emitted = 0;

        for seed in 0..20 {
            let config = SimulatorConfig {
                seed: Some(seed),
                ..Default::default()
            };
            let mut sim = PriceSimulator::new(crate::market::default_instruments(), &config);
            for step in 0..400 {
                sim.advance();
                if step < 100 || step % 10 != 0 {
                    continue;
                }
                let regime = sim.current_state().volatility_regime;
                for instrument in crate::market::default_instruments() {
                    let history = sim.snapshot(&instrument.symbol).unwrap();
                    if let Some(signal) = generator.generate(&instrument.symbol, &history, regime) {
                        assert!((0.0..=100.0).contains(&signal.confidence));
                        assert!(signal.confidence >= 60.0);
                        assert!(signal.risk_reward_ratio >= 1.5);
                        assert!(history.len() >= 100);
                        match signal.direction {
                            Direction::Buy => {
                                assert!(signal.stop_loss < signal.entry_price);
                                assert!(signal.take_profit > signal.entry_price);
                            }
                            Direction::Sell => {
                                assert!(signal.stop_loss > signal.entry_price);
                                assert!(signal.take_profit < signal.entry_price);
                            }
                        }
                        emitted += 1;
                    }
                }
            }
        }

        assert!(emitted > 0, "no signals emitted across 20 seeds");
    }

    #[test]
    fn test_confidence_gate_discards() {
        let strict = SignalGenerator::new(&StrategyConfig {
            min_confidence: 101.0,
            ..Default::default()
        });
        let history = steady_series(Trend::Uptrend, 150);
        let evaluation = strict.evaluate("TEST", &history, VolatilityRegime::Normal);
        assert!(evaluation.is_discard());
        assert!(evaluation.into_signal().is_none());
    }

    #[test]
    fn test_risk_reward_gate_discards() {
        let tight = SignalGenerator::new(&StrategyConfig {
            min_confidence: 0.0,
            target_atr_multiplier: 2.0,
            ..Default::default()
        });
        let history = steady_series(Trend::Uptrend, 150);
        let evaluation = tight.evaluate("TEST", &history, VolatilityRegime::Normal);
        assert!(matches!(evaluation, Evaluation::BelowRiskReward { .. }));
    }

    #[test]
    fn test_band_touch_counts_toward_quality() {
        // long flat stretch, then a sharp drop through the lower band
        let mut closes = vec![100.0; 120];
        closes.extend([99.0, 97.0, 94.0, 90.0, 85.0]);
        let history = history_from(&closes);

        let generator = SignalGenerator::new(&StrategyConfig {
            min_confidence: 0.0,
            ..Default::default()
        });
        let analysis = generator.analyze(&history);
        assert_eq!(analysis.scores.volatility, 50.0);
        assert!(analysis.indicators.rsi < 20.0);

        let buy = SignalGenerator::quality(
            &analysis.indicators,
            Direction::Buy,
            VolatilityRegime::Normal,
        );
        assert!(buy >= SignalQuality::Premium);

        let capped = SignalGenerator::quality(
            &analysis.indicators,
            Direction::Buy,
            VolatilityRegime::High,
        );
        assert_eq!(capped, SignalQuality::High);
    }
}
