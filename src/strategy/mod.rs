pub mod generator;
pub mod indicators;
pub mod regime;
pub mod signals;

pub use generator::{Analysis, Evaluation, ScoreBreakdown, SignalGenerator};
pub use indicators::IndicatorSnapshot;
pub use regime::MarketRegime;
pub use signals::{Direction, Signal, SignalQuality, SignalStatus, Timeframe};
