pub mod feed;
pub mod history;
pub mod instruments;
pub mod simulator;

pub use feed::{MarketFeed, TickDriver};
pub use history::{PriceHistory, PriceTick};
pub use instruments::{default_instruments, display_symbol, AssetClass, Instrument};
pub use simulator::{MarketState, MarketView, PriceSimulator, Trend, VolatilityRegime};
