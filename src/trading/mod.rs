pub mod monitor;
pub mod orchestrator;

pub use monitor::SignalMonitor;
pub use orchestrator::{AppContext, IndicatorReport, MarketStats, TradingOrchestrator};
