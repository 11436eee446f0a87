use serde::{Deserialize, Serialize};

use crate::strategy::{MarketRegime, Signal, Timeframe};

/// Recipient policy. Empty `symbols`/`regimes`/`timeframes` lists allow
/// everything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub min_confidence: f64,
    pub min_risk_reward: f64,
    pub timeframes: Vec<Timeframe>,
    pub symbols: Vec<String>,
    pub regimes: Vec<MarketRegime>,
    /// Descriptive; only the websocket broadcast is delivered here.
    pub channels: Vec<String>,
    pub max_alerts_per_instrument: usize,
    pub rate_limit_window_minutes: u32,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 70.0,
            min_risk_reward: 1.5,
            timeframes: vec![Timeframe::M1, Timeframe::M5, Timeframe::M15],
            symbols: Vec::new(),
            regimes: Vec::new(),
            channels: vec!["websocket".to_string()],
            max_alerts_per_instrument: 3,
            rate_limit_window_minutes: 30,
        }
    }
}

pub fn should_notify(signal: &Signal, settings: &NotificationSettings) -> bool {
    if !settings.enabled {
        return false;
    }
    if signal.confidence < settings.min_confidence
        || signal.risk_reward_ratio < settings.min_risk_reward
    {
        return false;
    }

    let allowed = |empty: bool, contains: bool| empty || contains;
    allowed(
        settings.timeframes.is_empty(),
        settings.timeframes.contains(&signal.timeframe),
    ) && allowed(
        settings.symbols.is_empty(),
        settings.symbols.iter().any(|s| s == &signal.symbol),
    ) && allowed(
        settings.regimes.is_empty(),
        settings.regimes.contains(&signal.regime),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::alert::fixtures;

    #[test]
    fn test_disabled_short_circuits() {
        let settings = NotificationSettings {
            enabled: false,
            min_confidence: 0.0,
            min_risk_reward: 0.0,
            ..Default::default()
        };
        assert!(!should_notify(&fixtures::signal("BTCUSDT", 99.0), &settings));
    }

    #[test]
    fn test_confidence_threshold() {
        let settings = NotificationSettings {
            min_confidence: 90.0,
            ..Default::default()
        };
        assert!(!should_notify(&fixtures::signal("BTCUSDT", 85.0), &settings));
        assert!(should_notify(&fixtures::signal("BTCUSDT", 90.0), &settings));
    }

    #[test]
    fn test_risk_reward_threshold() {
        let settings = NotificationSettings {
            min_risk_reward: 2.0,
            ..Default::default()
        };
        // fixture ratio is 1.8
        assert!(!should_notify(&fixtures::signal("BTCUSDT", 80.0), &settings));
    }

    #[test]
    fn test_allow_lists() {
        let signal = fixtures::signal("ETHUSDT", 80.0);
        assert!(should_notify(&signal, &NotificationSettings::default()));

        let other_symbols = NotificationSettings {
            symbols: vec!["BTCUSDT".to_string()],
            ..Default::default()
        };
        assert!(!should_notify(&signal, &other_symbols));

        let other_timeframe = NotificationSettings {
            timeframes: vec![Timeframe::M1],
            ..Default::default()
        };
        assert!(!should_notify(&signal, &other_timeframe));

        let other_regime = NotificationSettings {
            regimes: vec![MarketRegime::Sideways],
            ..Default::default()
        };
        assert!(!should_notify(&signal, &other_regime));

        let any_timeframe = NotificationSettings {
            timeframes: Vec::new(),
            regimes: vec![MarketRegime::Trending],
            ..Default::default()
        };
        assert!(should_notify(&signal, &any_timeframe));
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: NotificationSettings =
            serde_json::from_str(r#"{"min_confidence": 85, "timeframes": ["1m"]}"#).unwrap();
        assert_eq!(settings.min_confidence, 85.0);
        assert_eq!(settings.timeframes, vec![Timeframe::M1]);
        assert!(settings.enabled);
        assert_eq!(settings.max_alerts_per_instrument, 3);
    }
}
