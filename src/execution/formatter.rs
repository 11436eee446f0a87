use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::strategy::{Direction, Signal};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Call,
    Put,
}

impl From<Direction> for Action {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Buy => Action::Call,
            Direction::Sell => Action::Put,
        }
    }
}

impl Action {
    pub fn direction(&self) -> Direction {
        match self {
            Action::Call => Direction::Buy,
            Action::Put => Direction::Sell,
        }
    }
}

/// Broker-neutral order derived from a signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionOrder {
    pub signal_id: Uuid,
    pub asset: String,
    pub action: Action,
    pub amount: f64,
    pub expiration_minutes: u32,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub confidence: f64,
    pub risk_reward_ratio: f64,
    pub justification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionOutcome {
    pub order_id: String,
    pub broker: String,
    pub success: bool,
    pub fill_price: Option<f64>,
    pub message: String,
    pub executed_at: DateTime<Utc>,
}

pub fn format_for_execution(signal: &Signal, amount: f64, expiration_minutes: u32) -> ExecutionOrder {
    ExecutionOrder {
        signal_id: signal.id,
        asset: signal.symbol.clone(),
        action: signal.direction.into(),
        amount,
        expiration_minutes,
        entry_price: signal.entry_price,
        stop_loss: signal.stop_loss,
        take_profit: signal.take_profit,
        confidence: signal.confidence,
        risk_reward_ratio: signal.risk_reward_ratio,
        justification: signal.justification.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::alert::fixtures;

    #[test]
    fn test_format_copies_levels_and_maps_action() {
        let mut signal = fixtures::signal("EURUSD", 78.0);
        let order = format_for_execution(&signal, 25.0, 5);
        assert_eq!(order.action, Action::Call);
        assert_eq!(order.asset, "EURUSD");
        assert_eq!(order.amount, 25.0);
        assert_eq!(order.expiration_minutes, 5);
        assert_eq!(order.stop_loss, signal.stop_loss);
        assert_eq!(order.signal_id, signal.id);

        signal.direction = Direction::Sell;
        assert_eq!(format_for_execution(&signal, 1.0, 1).action, Action::Put);
    }

    #[test]
    fn test_action_wire_labels() {
        assert_eq!(serde_json::to_string(&Action::Put).unwrap(), "\"put\"");
        assert_eq!(Action::Call.direction(), Direction::Buy);
    }
}
