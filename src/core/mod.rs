pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;

pub use config::Config;
pub use error::{ExecutionError, SimulationError, StoreError};
pub use health::HealthChecker;
pub use metrics::PipelineMetrics;
