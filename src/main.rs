//! Wallet screening command-line entrypoint.
//!
//! Screens one address and prints the resulting screening record as JSON:
//!
//! ```text
//! wallet-screen <address> [chain]
//! ```
//!
//! `chain` defaults to `ethereum`.
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `RUST_LOG` controls log filtering (default `info`)
//! - `DEMO_MODE=1` screens against the static graph at `DEMO_GRAPH_PATH`
//! - otherwise `ETHERSCAN_API_KEY` is required
//! - `BLACKLIST_PATH` points at the blacklist JSON file
//! - `SCREEN_*` variables override scan limits

use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use wallet_screen::{Address, Screener};

const DEFAULT_CHAIN: &str = "ethereum";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env variables
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(raw_address) = args.next() else {
        eprintln!("usage: wallet-screen <address> [chain]");
        std::process::exit(2);
    };
    let chain = args
        .next()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CHAIN.to_string());

    // Invalid addresses never reach the screener
    let address = match Address::parse(&raw_address) {
        Ok(address) => address,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let screener = match Screener::from_env() {
        Ok(screener) => screener,
        Err(e) => {
            tracing::error!("Failed to initialize screener: {}", e);
            std::process::exit(1);
        }
    };

    let (record, failed) = match screener.screen(&chain, &address).await {
        Ok(result) => (result.to_record(), false),
        Err(e) => (screener.error_result(&e).to_record(), true),
    };

    println!("{}", serde_json::to_string_pretty(&record)?);

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
