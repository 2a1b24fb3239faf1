//! Tail application: wires config, client callbacks and shutdown.

use crate::config::AppConfig;
use crate::error::AppResult;
use huobi_client::SpotWs;
use tracing::info;

pub struct TailApp {
    config: AppConfig,
    ws: SpotWs,
}

impl TailApp {
    /// Build the client and register a logging callback for every kind.
    pub fn new(config: AppConfig) -> Self {
        let ws = SpotWs::with_config(config.connection.clone());

        ws.on_depth(|depth| {
            info!(
                pair = %depth.pair,
                bids = depth.bids.len(),
                asks = depth.asks.len(),
                best_bid = ?depth.best_bid().map(|l| l.price),
                best_ask = ?depth.best_ask().map(|l| l.price),
                "depth"
            );
        });
        ws.on_ticker(|ticker| {
            info!(
                pair = %ticker.pair,
                last = %ticker.last,
                high = %ticker.high,
                low = %ticker.low,
                vol = %ticker.vol,
                "ticker"
            );
        });
        ws.on_trade(|trade| {
            info!(
                pair = %trade.pair,
                trade_id = trade.trade_id,
                side = %trade.side,
                price = %trade.price,
                amount = %trade.amount,
                "trade"
            );
        });
        ws.on_candle(|candle| {
            info!(
                pair = %candle.pair,
                period = %candle.period,
                open_time = %candle.open_time,
                open = %candle.open,
                close = %candle.close,
                volume = %candle.volume,
                "candle"
            );
        });

        Self { config, ws }
    }

    pub fn client(&self) -> &SpotWs {
        &self.ws
    }

    /// Subscribe every configured market/channel. Returns the count.
    pub fn subscribe_all(&self) -> AppResult<usize> {
        let subscriptions = self.config.subscriptions()?;
        let count = subscriptions.len();
        for subscription in subscriptions {
            self.ws.subscribe(subscription)?;
        }
        info!(count, markets = self.config.markets.len(), "Subscriptions issued");
        Ok(count)
    }

    /// Subscribe, then run until Ctrl-C.
    pub async fn run(&self) -> AppResult<()> {
        self.subscribe_all()?;

        tokio::signal::ctrl_c().await?;
        info!("Ctrl-C received, shutting down");

        self.ws.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huobi_client::SessionState;

    #[tokio::test]
    async fn test_subscribe_all_registers_every_channel() {
        let config = AppConfig::from_toml(
            r#"
            [connection]
            url = "ws://127.0.0.1:1"
            max_reconnect_attempts = 1

            [[markets]]
            base = "btc"
            quote = "usdt"
            channels = ["depth", "trade"]
            "#,
        )
        .unwrap();
        let app = TailApp::new(config);

        assert_eq!(app.subscribe_all().unwrap(), 2);
        let channels: Vec<String> = app
            .client()
            .subscriptions()
            .iter()
            .map(|s| s.channel())
            .collect();
        assert_eq!(
            channels,
            vec!["market.btcusdt.mbp.refresh.20", "market.btcusdt.trade.detail"]
        );
        assert_ne!(app.client().state(), SessionState::Unconnected);

        app.client().close().await;
    }
}
