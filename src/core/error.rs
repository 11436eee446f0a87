use thiserror::Error;

/// Failure of one instrument's price step. Caught by the tick loop and never
/// propagated past it.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid volatility {volatility} for {symbol}")]
    InvalidVolatility { symbol: String, volatility: f64 },

    #[error("non-finite price computed for {symbol}")]
    NonFinitePrice { symbol: String },

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("broker {broker} rejected order: {reason}")]
    Rejected { broker: String, reason: String },
}
