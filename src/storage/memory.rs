use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SignalQuery, SignalStore};
use crate::core::StoreError;
use crate::notifications::Alert;
use crate::strategy::Signal;

/// Bounded in-process log. Oldest records fall off once `capacity` is reached.
pub struct MemoryStore {
    capacity: usize,
    signals: RwLock<VecDeque<Signal>>,
    alerts: RwLock<VecDeque<Alert>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            signals: RwLock::new(VecDeque::new()),
            alerts: RwLock::new(VecDeque::new()),
        }
    }

    fn push_bounded<T>(log: &mut VecDeque<T>, item: T, capacity: usize) {
        if log.len() == capacity {
            log.pop_front();
        }
        log.push_back(item);
    }
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn save_signal(&self, signal: &Signal) -> Result<(), StoreError> {
        let mut signals = self.signals.write().await;
        Self::push_bounded(&mut signals, signal.clone(), self.capacity);
        Ok(())
    }

    async fn save_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut alerts = self.alerts.write().await;
        Self::push_bounded(&mut alerts, alert.clone(), self.capacity);
        Ok(())
    }

    async fn recent_signals(&self, query: &SignalQuery) -> Result<Vec<Signal>, StoreError> {
        let signals = self.signals.read().await;
        let matching = signals
            .iter()
            .rev()
            .filter(|s| query.matches(s))
            .cloned();
        Ok(query.take_capped(matching))
    }

    async fn find_signal(&self, id: Uuid) -> Result<Option<Signal>, StoreError> {
        let signals = self.signals.read().await;
        Ok(signals.iter().find(|s| s.id == id).cloned())
    }

    async fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StoreError> {
        let alerts = self.alerts.read().await;
        Ok(alerts.iter().rev().take(limit).cloned().collect())
    }

    async fn mark_alert_read(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut alerts = self.alerts.write().await;
        match alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::alert::{build_alert, fixtures};

    #[tokio::test]
    async fn test_signals_newest_first_and_bounded() {
        let store = MemoryStore::new(3);
        let mut ids = Vec::new();
        for _ in 0..4 {
            let signal = fixtures::signal("BTCUSDT", 70.0);
            ids.push(signal.id);
            store.save_signal(&signal).await.unwrap();
        }

        let recent = store.recent_signals(&SignalQuery::default()).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, ids[3]);
        assert!(store.find_signal(ids[0]).await.unwrap().is_none());
        assert!(store.find_signal(ids[1]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mark_alert_read() {
        let store = MemoryStore::new(10);
        let alert = build_alert(&fixtures::signal("EURUSD", 72.0));
        store.save_alert(&alert).await.unwrap();

        assert!(store.mark_alert_read(alert.id).await.unwrap());
        assert!(!store.mark_alert_read(Uuid::new_v4()).await.unwrap());

        let alerts = store.recent_alerts(10).await.unwrap();
        assert!(alerts[0].is_read);
    }
}
