pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::core::config::StorageConfig;
use crate::core::StoreError;
use crate::notifications::Alert;
use crate::strategy::{MarketRegime, Signal, Timeframe};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Append-only record log for signals and alerts. The pipeline only writes;
/// reads serve the transport layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn save_signal(&self, signal: &Signal) -> Result<(), StoreError>;

    async fn save_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    /// Newest first, filtered and capped per `query`.
    async fn recent_signals(&self, query: &SignalQuery) -> Result<Vec<Signal>, StoreError>;

    async fn find_signal(&self, id: Uuid) -> Result<Option<Signal>, StoreError>;

    async fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StoreError>;

    /// Returns false when no alert has this id.
    async fn mark_alert_read(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalQuery {
    pub symbol: Option<String>,
    pub timeframe: Option<Timeframe>,
    pub regime: Option<MarketRegime>,
    pub since: Option<DateTime<Utc>>,
    pub limit: usize,
    pub per_symbol: usize,
}

impl Default for SignalQuery {
    fn default() -> Self {
        Self {
            symbol: None,
            timeframe: None,
            regime: None,
            since: None,
            limit: 50,
            per_symbol: 20,
        }
    }
}

impl SignalQuery {
    pub fn matches(&self, signal: &Signal) -> bool {
        self.symbol.as_deref().map_or(true, |s| s == signal.symbol)
            && self.timeframe.map_or(true, |t| t == signal.timeframe)
            && self.regime.map_or(true, |r| r == signal.regime)
            && self.since.map_or(true, |since| signal.created_at >= since)
    }

    /// Applies the per-symbol and total caps to an already filtered,
    /// newest-first sequence.
    pub fn take_capped(&self, newest_first: impl IntoIterator<Item = Signal>) -> Vec<Signal> {
        let mut per_symbol: HashMap<String, usize> = HashMap::new();
        let mut out = Vec::new();

        for signal in newest_first {
            if out.len() >= self.limit {
                break;
            }
            let seen = per_symbol.entry(signal.symbol.clone()).or_insert(0);
            if *seen >= self.per_symbol {
                continue;
            }
            *seen += 1;
            out.push(signal);
        }

        out
    }
}

/// Sqlite when `database_url` is set, otherwise the in-memory log.
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn SignalStore>, StoreError> {
    match &config.database_url {
        Some(url) => {
            let store = SqliteStore::connect(url).await?;
            info!("💾 Signal store: sqlite ({})", url);
            Ok(Arc::new(store))
        }
        None => {
            info!(
                "💾 Signal store: in-memory (capacity {})",
                config.memory_capacity
            );
            Ok(Arc::new(MemoryStore::new(config.memory_capacity)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::alert::fixtures;
    use chrono::Duration;

    #[test]
    fn test_query_filters() {
        let mut signal = fixtures::signal("ETHUSDT", 75.0);
        let query = SignalQuery {
            symbol: Some("ETHUSDT".to_string()),
            timeframe: Some(Timeframe::M5),
            ..Default::default()
        };
        assert!(query.matches(&signal));

        signal.regime = MarketRegime::Sideways;
        let by_regime = SignalQuery {
            regime: Some(MarketRegime::Trending),
            ..Default::default()
        };
        assert!(!by_regime.matches(&signal));

        let recent_only = SignalQuery {
            since: Some(Utc::now() + Duration::minutes(1)),
            ..Default::default()
        };
        assert!(!recent_only.matches(&signal));
    }

    #[test]
    fn test_caps_per_symbol_and_total() {
        let signals: Vec<Signal> = (0..5)
            .map(|_| fixtures::signal("BTCUSDT", 70.0))
            .chain((0..5).map(|_| fixtures::signal("EURUSD", 70.0)))
            .collect();

        let query = SignalQuery {
            limit: 4,
            per_symbol: 2,
            ..Default::default()
        };
        let capped = query.take_capped(signals);
        assert_eq!(capped.len(), 4);
        assert_eq!(capped.iter().filter(|s| s.symbol == "BTCUSDT").count(), 2);
        assert_eq!(capped.iter().filter(|s| s.symbol == "EURUSD").count(), 2);
    }
}
