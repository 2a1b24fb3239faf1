//! Huobi spot market-data websocket client.
//!
//! ```no_run
//! use huobi_client::SpotWs;
//! use huobi_core::CurrencyPair;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let ws = SpotWs::new();
//! ws.on_trade(|trade| println!("{} {} @ {}", trade.pair, trade.amount, trade.price));
//! ws.subscribe_trade(CurrencyPair::new("BTC", "USDT")?)?;
//! # Ok(())
//! # }
//! ```
//!
//! One socket per client. Callbacks run on the connection task, one at a
//! time, in wire order.

pub mod error;
pub mod router;
pub mod session;

pub use error::{ClientError, ClientResult};
pub use router::{FrameRouter, RouteOutcome};
pub use session::{SessionState, SpotWs};

pub use huobi_feed::EventHandlers;
pub use huobi_ws::{init_crypto, ConnectionConfig, Subscription};
