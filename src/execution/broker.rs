use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::formatter::{ExecutionOrder, ExecutionOutcome};
use super::BrokerKind;
use crate::core::ExecutionError;
use crate::market::display_symbol;
use crate::notifications::{Alert, AlertType, Priority};

#[async_trait]
pub trait Broker: Send + Sync {
    fn name(&self) -> &'static str;

    async fn place(&self, order: &ExecutionOrder) -> Result<ExecutionOutcome, ExecutionError>;
}

pub fn build_broker(kind: BrokerKind) -> Arc<dyn Broker> {
    match kind {
        BrokerKind::Paper => Arc::new(PaperBroker::new()),
    }
}

/// Fills every valid order immediately at its entry price.
#[derive(Default)]
pub struct PaperBroker {
    fills: RwLock<Vec<ExecutionOrder>>,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fill_count(&self) -> usize {
        self.fills.read().await.len()
    }
}

#[async_trait]
impl Broker for PaperBroker {
    fn name(&self) -> &'static str {
        "paper"
    }

    async fn place(&self, order: &ExecutionOrder) -> Result<ExecutionOutcome, ExecutionError> {
        if !order.amount.is_finite() || order.amount <= 0.0 {
            return Err(ExecutionError::InvalidOrder(format!(
                "amount must be positive, got {}",
                order.amount
            )));
        }
        if order.expiration_minutes == 0 {
            return Err(ExecutionError::InvalidOrder(
                "expiration must be at least one minute".to_string(),
            ));
        }

        let order_id = Uuid::new_v4().to_string();
        info!(
            "📝 PAPER TRADE: {:?} {} - ${:.2} exp {}m @ {:.5} [{}]",
            order.action,
            order.asset,
            order.amount,
            order.expiration_minutes,
            order.entry_price,
            &order_id[..8]
        );
        self.fills.write().await.push(order.clone());

        Ok(ExecutionOutcome {
            order_id,
            broker: self.name().to_string(),
            success: true,
            fill_price: Some(order.entry_price),
            message: "paper order filled".to_string(),
            executed_at: Utc::now(),
        })
    }
}

/// `order_execution` alert describing what the broker did with an order.
pub fn execution_alert(order: &ExecutionOrder, outcome: &ExecutionOutcome) -> Alert {
    let pair = display_symbol(&order.asset);
    let title = if outcome.success {
        format!("✅ Order via {} - {}", outcome.broker, pair)
    } else {
        format!("❌ Order failed via {} - {}", outcome.broker, pair)
    };
    let action = match order.action {
        super::Action::Call => "CALL",
        super::Action::Put => "PUT",
    };

    Alert {
        id: Uuid::new_v4(),
        signal_id: order.signal_id,
        alert_type: AlertType::OrderExecution,
        title,
        message: format!(
            "{} • ${:.2} • exp {}m • via {} • {}",
            action, order.amount, order.expiration_minutes, outcome.broker, outcome.message
        ),
        priority: Priority::High,
        symbol: order.asset.clone(),
        direction: order.action.direction(),
        is_read: false,
        created_at: outcome.executed_at,
    }
}
