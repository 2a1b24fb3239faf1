//! huobi-tail - log Huobi spot market data until interrupted.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Tail Huobi spot market data to structured logs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via HUOBI_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Print Prometheus metrics to stdout on exit
    #[arg(long)]
    dump_metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    huobi_client::init_crypto();

    let args = Args::parse();

    huobi_telemetry::init_logging()?;

    info!("Starting huobi-tail v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > HUOBI_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("HUOBI_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = huobi_tail::AppConfig::from_file(&config_path)?;
    info!(
        url = %config.connection.url,
        markets = config.markets.len(),
        "Configuration loaded"
    );

    let app = huobi_tail::TailApp::new(config);
    app.run().await?;

    if args.dump_metrics {
        println!("{}", huobi_telemetry::Metrics::render()?);
    }

    Ok(())
}
