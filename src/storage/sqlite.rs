use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use uuid::Uuid;

use super::{SignalQuery, SignalStore};
use crate::core::StoreError;
use crate::notifications::Alert;
use crate::strategy::Signal;

/// Records are kept as JSON payloads next to the columns the queries filter on.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Accepts a `sqlite:` url or a plain file path.
    pub async fn connect(database: &str) -> Result<Self, StoreError> {
        let connection_string = if database.starts_with("sqlite:") {
            database.to_string()
        } else {
            if let Some(parent) = Path::new(database).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            }
            format!("sqlite://{}?mode=rwc", database)
        };

        // every in-memory connection is its own database
        let max_connections = if connection_string.contains(":memory:") {
            1
        } else {
            5
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&connection_string)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signals (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                direction TEXT NOT NULL,
                confidence REAL NOT NULL,
                timeframe TEXT NOT NULL,
                regime TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                payload TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY,
                signal_id TEXT NOT NULL,
                alert_type TEXT NOT NULL,
                priority TEXT NOT NULL,
                symbol TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                payload TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_signals_symbol_time
            ON signals(symbol, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_alerts_time
            ON alerts(created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("✅ Signal store schema initialized");
        Ok(())
    }
}

#[async_trait]
impl SignalStore for SqliteStore {
    async fn save_signal(&self, signal: &Signal) -> Result<(), StoreError> {
        let payload = serde_json::to_string(signal)?;
        sqlx::query(
            r#"
            INSERT INTO signals (id, symbol, direction, confidence, timeframe, regime, created_at, payload)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(signal.id.to_string())
        .bind(&signal.symbol)
        .bind(signal.direction.to_string())
        .bind(signal.confidence)
        .bind(signal.timeframe.as_str())
        .bind(signal.regime.as_str())
        .bind(signal.created_at.timestamp_millis())
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let payload = serde_json::to_string(alert)?;
        sqlx::query(
            r#"
            INSERT INTO alerts (id, signal_id, alert_type, priority, symbol, is_read, created_at, payload)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(alert.id.to_string())
        .bind(alert.signal_id.to_string())
        .bind(alert.alert_type.as_str())
        .bind(alert.priority.as_str())
        .bind(&alert.symbol)
        .bind(alert.is_read)
        .bind(alert.created_at.timestamp_millis())
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_signals(&self, query: &SignalQuery) -> Result<Vec<Signal>, StoreError> {
        let since = query.since.map_or(i64::MIN, |t| t.timestamp_millis());
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT payload FROM signals
            WHERE (?1 IS NULL OR symbol = ?1)
              AND (?2 IS NULL OR timeframe = ?2)
              AND (?3 IS NULL OR regime = ?3)
              AND created_at >= ?4
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(query.symbol.as_deref())
        .bind(query.timeframe.map(|t| t.as_str()))
        .bind(query.regime.map(|r| r.as_str()))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let signals = rows
            .iter()
            .map(|payload| serde_json::from_str::<Signal>(payload))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(query.take_capped(signals))
    }

    async fn find_signal(&self, id: Uuid) -> Result<Option<Signal>, StoreError> {
        let row = sqlx::query_scalar::<_, String>("SELECT payload FROM signals WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StoreError> {
        let rows = sqlx::query_as::<_, (String, bool)>(
            r#"
            SELECT payload, is_read FROM alerts
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut alerts = Vec::with_capacity(rows.len());
        for (payload, is_read) in rows {
            let mut alert: Alert = serde_json::from_str(&payload)?;
            alert.is_read = is_read;
            alerts.push(alert);
        }
        Ok(alerts)
    }

    async fn mark_alert_read(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE alerts SET is_read = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::alert::{build_alert, fixtures};
    use crate::strategy::Timeframe;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_signal_round_trip_and_filters() {
        let store = store().await;
        let btc = fixtures::signal("BTCUSDT", 74.0);
        let mut eur = fixtures::signal("EURUSD", 88.0);
        eur.timeframe = Timeframe::M1;
        store.save_signal(&btc).await.unwrap();
        store.save_signal(&eur).await.unwrap();

        assert_eq!(store.find_signal(btc.id).await.unwrap(), Some(btc.clone()));

        let only_eur = SignalQuery {
            timeframe: Some(Timeframe::M1),
            ..Default::default()
        };
        let found = store.recent_signals(&only_eur).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, eur.id);

        let by_symbol = SignalQuery {
            symbol: Some("BTCUSDT".to_string()),
            ..Default::default()
        };
        assert_eq!(store.recent_signals(&by_symbol).await.unwrap()[0].id, btc.id);
    }

    #[tokio::test]
    async fn test_alert_read_flag_persists() {
        let store = store().await;
        let alert = build_alert(&fixtures::signal("GBPUSD", 81.0));
        store.save_alert(&alert).await.unwrap();

        assert!(store.mark_alert_read(alert.id).await.unwrap());
        let alerts = store.recent_alerts(5).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].is_read);
        assert!(!store.mark_alert_read(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_signal_is_an_error() {
        let store = store().await;
        let signal = fixtures::signal("BTCUSDT", 70.0);
        store.save_signal(&signal).await.unwrap();
        assert!(matches!(
            store.save_signal(&signal).await,
            Err(StoreError::Database(_))
        ));
    }
}
