use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::execution::BrokerKind;
use crate::notifications::NotificationSettings;

/// Runtime configuration. Every field has a default, so an empty environment
/// yields a runnable simulator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulator: SimulatorConfig,
    pub strategy: StrategyConfig,
    pub streaming: StreamingConfig,
    pub storage: StorageConfig,
    pub execution: ExecutionConfig,
    /// Initial notification policy; replaceable at runtime over HTTP.
    pub notifications: NotificationSettings,
    pub server: ServerConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub tick_interval_ms: u64,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Ticks generated synchronously at startup before the loops begin.
    pub warmup_ticks: usize,
    pub history_capacity: usize,
    pub trend_flip_probability: f64,
    pub regime_flip_probability: f64,
    pub mean_reversion_strength: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            seed: None,
            warmup_ticks: 200,
            history_capacity: 500,
            trend_flip_probability: 0.02,
            regime_flip_probability: 0.01,
            mean_reversion_strength: 0.002,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub monitor_interval_secs: u64,
    pub min_history: usize,
    pub min_confidence: f64,
    pub min_risk_reward: f64,
    pub stop_atr_multiplier: f64,
    pub target_atr_multiplier: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: 8,
            min_history: 100,
            min_confidence: 60.0,
            min_risk_reward: 1.5,
            stop_atr_multiplier: 2.0,
            target_atr_multiplier: 3.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub snapshot_interval_secs: u64,
    /// Per-subscriber queue depth; a subscriber whose queue is full is evicted.
    pub subscriber_buffer: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_secs: 2,
            subscriber_buffer: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `sqlite://...` url. Unset keeps records in memory.
    pub database_url: Option<String>,
    pub memory_capacity: usize,
    pub max_signals_per_symbol: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            memory_capacity: 5000,
            max_signals_per_symbol: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub broker: BrokerKind,
    pub default_amount: f64,
    pub default_expiration_minutes: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            broker: BrokerKind::Paper,
            default_amount: 10.0,
            default_expiration_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Layers `.env`, an optional `market-pulse.toml` and `MARKET_PULSE__*`
    /// variables (e.g. `MARKET_PULSE__SIMULATOR__TICK_INTERVAL_MS=250`) over
    /// the defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name("market-pulse").required(false))
            .add_source(
                ::config::Environment::with_prefix("MARKET_PULSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to assemble configuration sources")?;

        let config: Config = settings
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.simulator.tick_interval_ms > 0,
            "simulator.tick_interval_ms must be positive"
        );
        anyhow::ensure!(
            self.simulator.history_capacity > 0,
            "simulator.history_capacity must be positive"
        );
        anyhow::ensure!(
            self.strategy.monitor_interval_secs > 0,
            "strategy.monitor_interval_secs must be positive"
        );
        anyhow::ensure!(
            self.streaming.snapshot_interval_secs > 0,
            "streaming.snapshot_interval_secs must be positive"
        );
        anyhow::ensure!(
            self.streaming.subscriber_buffer > 0,
            "streaming.subscriber_buffer must be positive"
        );
        for (name, p) in [
            ("trend_flip_probability", self.simulator.trend_flip_probability),
            ("regime_flip_probability", self.simulator.regime_flip_probability),
        ] {
            anyhow::ensure!(
                (0.0..=1.0).contains(&p),
                "simulator.{} must be within [0, 1], got {}",
                name,
                p
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulator.history_capacity, 500);
        assert_eq!(config.strategy.min_history, 100);
        assert_eq!(config.strategy.min_risk_reward, 1.5);
        assert!(config.storage.database_url.is_none());
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let mut config = Config::default();
        config.simulator.trend_flip_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"strategy": {"min_confidence": 75.0}}"#).unwrap();
        assert_eq!(config.strategy.min_confidence, 75.0);
        assert_eq!(config.strategy.min_history, 100);
        assert_eq!(config.server.port, 8001);
    }
}
