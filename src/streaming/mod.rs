pub mod broadcaster;
pub mod events;

pub use broadcaster::{Broadcaster, SubscriberId, Subscription};
pub use events::{market_snapshot, Event, TickerSnapshot};
