//! Application configuration.

use crate::error::{AppError, AppResult};
use huobi_client::{ConnectionConfig, Subscription};
use huobi_core::{ChannelKind, CurrencyPair, KlinePeriod};
use serde::{Deserialize, Serialize};

/// One instrument and the channels to tail for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Base currency (e.g., "btc"). Case-insensitive.
    pub base: String,
    /// Quote currency (e.g., "usdt"). Case-insensitive.
    pub quote: String,
    /// Channels to subscribe, in order. Default: all four.
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelKind>,
    /// Candle period. Only used when `candle` is listed. Default: 1min.
    #[serde(default)]
    pub period: KlinePeriod,
}

fn default_channels() -> Vec<ChannelKind> {
    ChannelKind::ALL.to_vec()
}

impl MarketConfig {
    pub fn pair(&self) -> AppResult<CurrencyPair> {
        Ok(CurrencyPair::new(&self.base, &self.quote)?)
    }

    /// Subscriptions for this market, in channel order.
    pub fn subscriptions(&self) -> AppResult<Vec<Subscription>> {
        let pair = self.pair()?;
        Ok(self
            .channels
            .iter()
            .map(|kind| match kind {
                ChannelKind::Depth => Subscription::depth(pair.clone()),
                ChannelKind::Ticker => Subscription::ticker(pair.clone()),
                ChannelKind::Trade => Subscription::trade(pair.clone()),
                ChannelKind::Candle => Subscription::candle(pair.clone(), self.period),
            })
            .collect())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Unknown channel names and period tokens are already rejected while
    /// parsing; this checks what serde cannot.
    pub fn validate(&self) -> AppResult<()> {
        if self.markets.is_empty() {
            return Err(AppError::Config("No markets configured".to_string()));
        }
        for market in &self.markets {
            market.pair()?;
            if market.channels.is_empty() {
                return Err(AppError::Config(format!(
                    "Market {}/{} lists no channels",
                    market.base, market.quote
                )));
            }
        }
        Ok(())
    }

    /// Every subscription, market by market.
    pub fn subscriptions(&self) -> AppResult<Vec<Subscription>> {
        let mut all = Vec::new();
        for market in &self.markets {
            all.extend(market.subscriptions()?);
        }
        Ok(all)
    }
}
