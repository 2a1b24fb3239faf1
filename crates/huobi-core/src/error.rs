//! Error types for huobi-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid currency pair: {0}")]
    InvalidPair(String),

    #[error("Unknown kline period token: {0}")]
    UnknownPeriod(String),

    #[error("Unknown channel kind: {0}")]
    UnknownChannelKind(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
