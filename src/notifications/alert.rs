use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::market::display_symbol;
use crate::strategy::{Direction, Signal};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    NewSignal,
    OrderExecution,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::NewSignal => "new_signal",
            AlertType::OrderExecution => "order_execution",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 80.0 {
            Priority::High
        } else if confidence >= 70.0 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

/// Operator-facing notification. Only `is_read` ever changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub signal_id: Uuid,
    pub alert_type: AlertType,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub symbol: String,
    pub direction: Direction,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

pub fn build_alert(signal: &Signal) -> Alert {
    let pair = display_symbol(&signal.symbol);
    let icon = match signal.direction {
        Direction::Buy => "🟢",
        Direction::Sell => "🔴",
    };

    Alert {
        id: Uuid::new_v4(),
        signal_id: signal.id,
        alert_type: AlertType::NewSignal,
        title: format!("{} {} {} ({})", icon, signal.direction, pair, signal.timeframe),
        message: format!(
            "{} {} @ {:.5} | confidence {:.1}% | R:R {:.2} | SL {:.5} | TP {:.5}",
            signal.direction,
            pair,
            signal.entry_price,
            signal.confidence,
            signal.risk_reward_ratio,
            signal.stop_loss,
            signal.take_profit,
        ),
        priority: Priority::from_confidence(signal.confidence),
        symbol: signal.symbol.clone(),
        direction: signal.direction,
        is_read: false,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::strategy::{IndicatorSnapshot, MarketRegime, SignalQuality, SignalStatus, Timeframe};

    pub fn signal(symbol: &str, confidence: f64) -> Signal {
        Signal {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            direction: Direction::Buy,
            confidence,
            entry_price: 100.0,
            stop_loss: 98.0,
            take_profit: 103.6,
            risk_reward_ratio: 1.8,
            regime: MarketRegime::Trending,
            quality: SignalQuality::High,
            timeframe: Timeframe::M5,
            justification: "test".to_string(),
            indicators: IndicatorSnapshot::default(),
            created_at: Utc::now(),
            status: SignalStatus::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_confidence() {
        assert_eq!(Priority::from_confidence(80.0), Priority::High);
        assert_eq!(Priority::from_confidence(79.9), Priority::Medium);
        assert_eq!(Priority::from_confidence(70.0), Priority::Medium);
        assert_eq!(Priority::from_confidence(65.0), Priority::Low);
    }

    #[test]
    fn test_alert_embeds_signal_details() {
        let signal = fixtures::signal("BTCUSDT", 82.0);
        let alert = build_alert(&signal);

        assert_eq!(alert.signal_id, signal.id);
        assert_eq!(alert.alert_type, AlertType::NewSignal);
        assert_eq!(alert.priority, Priority::High);
        assert!(!alert.is_read);
        assert!(alert.title.contains("BUY BTC/USDT"));
        assert!(alert.message.contains("confidence 82.0%"));
        assert!(alert.message.contains("R:R 1.80"));
        assert!(alert.message.contains("SL 98.00000"));
    }

    #[test]
    fn test_alert_wire_format() {
        let alert = build_alert(&fixtures::signal("EURUSD", 71.0));
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["alert_type"], "new_signal");
        assert_eq!(json["priority"], "medium");
        assert_eq!(json["direction"], "BUY");
    }
}
