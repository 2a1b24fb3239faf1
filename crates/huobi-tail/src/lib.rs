//! Tail Huobi spot market data to structured logs.
//!
//! Loads a market list from TOML, subscribes to every configured channel
//! and logs each event until interrupted.

pub mod app;
pub mod config;
pub mod error;

pub use app::TailApp;
pub use config::{AppConfig, MarketConfig};
pub use error::{AppError, AppResult};
