pub mod alert;
pub mod manager;
pub mod settings;

pub use alert::{build_alert, Alert, AlertType, Priority};
pub use manager::{AlertRateLimiter, NotificationManager};
pub use settings::{should_notify, NotificationSettings};
