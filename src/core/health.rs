use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentHealth,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub simulator: bool,
    pub monitor: bool,
    pub store: bool,
    pub broadcaster: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, bool>,
}

impl ComponentHealth {
    pub fn get(&self, key: &str) -> Option<bool> {
        match key {
            "simulator" => Some(self.simulator),
            "monitor" => Some(self.monitor),
            "store" => Some(self.store),
            "broadcaster" => Some(self.broadcaster),
            _ => self.extra.get(key).copied(),
        }
    }
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    status: Arc<RwLock<ComponentHealth>>,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            status: Arc::new(RwLock::new(ComponentHealth::default())),
        }
    }

    /// Healthy while both pipeline loops are alive; a failing store or an
    /// idle broadcaster only degrades.
    pub async fn get_status(&self) -> HealthStatus {
        let components = self.status.read().await.clone();

        let status = if !(components.simulator && components.monitor) {
            "down"
        } else if components.store && components.broadcaster {
            "healthy"
        } else {
            "degraded"
        };

        HealthStatus {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
        }
    }

    pub async fn update_component(&self, component: &str, healthy: bool) {
        let mut status = self.status.write().await;
        match component {
            "simulator" => status.simulator = healthy,
            "monitor" => status.monitor = healthy,
            "store" => status.store = healthy,
            "broadcaster" => status.broadcaster = healthy,
            _ => {
                status.extra.insert(component.to_string(), healthy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_transitions() {
        let checker = HealthChecker::new();
        assert_eq!(checker.get_status().await.status, "down");

        checker.update_component("simulator", true).await;
        checker.update_component("monitor", true).await;
        assert_eq!(checker.get_status().await.status, "degraded");

        checker.update_component("store", true).await;
        checker.update_component("broadcaster", true).await;
        let status = checker.get_status().await;
        assert_eq!(status.status, "healthy");
        assert_eq!(status.components.get("store"), Some(true));
    }

    #[tokio::test]
    async fn test_extra_components_are_tracked() {
        let checker = HealthChecker::new();
        checker.update_component("api", true).await;
        let status = checker.get_status().await;
        assert_eq!(status.components.get("api"), Some(true));
        assert_eq!(status.components.get("missing"), None);
    }
}
