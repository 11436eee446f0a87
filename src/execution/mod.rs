pub mod broker;
pub mod formatter;

use serde::{Deserialize, Serialize};

pub use broker::{build_broker, execution_alert, Broker, PaperBroker};
pub use formatter::{format_for_execution, Action, ExecutionOrder, ExecutionOutcome};

/// Broker selected by configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    #[default]
    Paper,
}
