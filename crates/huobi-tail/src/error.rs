//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client error: {0}")]
    Client(#[from] huobi_client::ClientError),

    #[error("Core error: {0}")]
    Core(#[from] huobi_core::CoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] huobi_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
