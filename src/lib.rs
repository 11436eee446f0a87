pub mod api;
pub mod core;
pub mod execution;
pub mod market;
pub mod notifications;
pub mod storage;
pub mod strategy;
pub mod streaming;
pub mod trading;

pub use crate::core::Config;
pub use trading::{AppContext, TradingOrchestrator};
