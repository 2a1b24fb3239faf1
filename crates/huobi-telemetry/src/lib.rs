//! Prometheus metrics and structured logging for the Huobi market-data client.
//!
//! - Prometheus counters and gauges for connection health and frame routing
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
