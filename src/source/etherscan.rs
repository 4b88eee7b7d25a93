//! Live transaction source backed by the Etherscan v2 account API.
//!
//! Two actions are used, `txlist` (normal transactions) and `tokentx` (token transfers),
//! both requested newest first with `offset = limit`.
//!
//! Etherscan reports most failures inside a `200 OK` body:
//!
//! ```json
//! { "status": "0", "message": "No transactions found", "result": [] }
//! { "status": "0", "message": "NOTOK", "result": "Max rate limit reached" }
//! ```
//!
//! The first is an empty success, the second is [`SourceError::RateLimited`]. Only
//! `status = "1"` with a list `result` yields transactions; any other shape is a
//! [`SourceError::Provider`] so a broken upstream never reads as an empty history.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::address::Address;
use crate::config::EtherscanConfig;
use crate::error::{Result, ScreeningError};
use crate::source::{SourceError, Transaction, TransactionSource};

const ACTION_NORMAL: &str = "txlist";
const ACTION_TOKEN: &str = "tokentx";

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EtherscanTx {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    time_stamp: String,
}

pub struct EtherscanSource {
    client: Client,
    config: EtherscanConfig,
}

impl EtherscanSource {
    pub fn new(config: EtherscanConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ScreeningError::ConfigError(
                "ETHERSCAN_API_KEY is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("wallet-screen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScreeningError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn fetch(&self, action: &str, address: &Address, limit: usize) -> std::result::Result<Vec<Transaction>, SourceError> {
        let chain_id = self.config.chain_id.to_string();
        let offset = limit.to_string();
        let query = [
            ("chainid", chain_id.as_str()),
            ("module", "account"),
            ("action", action),
            ("address", address.as_str()),
            ("startblock", "0"),
            ("endblock", "99999999"),
            ("sort", "desc"),
            ("page", "1"),
            ("offset", offset.as_str()),
            ("apikey", self.config.api_key.as_str()),
        ];

        debug!(action = action, address = %address, limit = limit, "Fetching Etherscan transactions");

        let response = self
            .client
            .get(self.config.base_url.clone())
            .query(&query)
            .send()
            .await
            .map_err(|e| SourceError::Provider(format!("Etherscan {} request failed: {}", action, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Provider(format!("Etherscan {} body read failed: {}", action, e)))?;

        parse_response(action, status, &body)
    }
}

/// Classifies an Etherscan HTTP response into transactions or a [`SourceError`].
fn parse_response(action: &str, status: StatusCode, body: &str) -> std::result::Result<Vec<Transaction>, SourceError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited(format!("Etherscan {} HTTP 429", action)));
    }
    if !status.is_success() {
        return Err(SourceError::Provider(format!("Etherscan HTTP {}", status.as_u16())));
    }

    let parsed: EtherscanResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::Provider(format!("Etherscan {} decode failed: {}", action, e)))?;

    if parsed.status == "0" {
        let message = parsed.message.to_lowercase();
        let detail = parsed.result.as_str().unwrap_or_default().to_lowercase();

        if message.contains("no transactions") {
            return Ok(Vec::new());
        }
        if message.contains("rate limit") || detail.contains("rate limit") {
            return Err(SourceError::RateLimited(format!(
                "Etherscan {}: {}",
                action,
                parsed.result.as_str().unwrap_or(&parsed.message)
            )));
        }

        let reason = if parsed.message.is_empty() { "unknown" } else { parsed.message.as_str() };
        return Err(SourceError::Provider(format!("Etherscan {} error: {}", action, reason)));
    }

    if parsed.status != "1" {
        return Err(SourceError::Provider(format!(
            "Etherscan {} unexpected status '{}'",
            action, parsed.status
        )));
    }
    if !parsed.result.is_array() {
        return Err(SourceError::Provider(format!(
            "Etherscan {} result is not a transaction list",
            action
        )));
    }

    let rows: Vec<EtherscanTx> = serde_json::from_value(parsed.result)
        .map_err(|e| SourceError::Provider(format!("Etherscan {} decode failed: {}", action, e)))?;

    let transactions = rows
        .into_iter()
        .filter_map(|row| match row.time_stamp.trim().parse::<u64>() {
            Ok(timestamp) => Some(Transaction::new(row.from, row.to, timestamp)),
            Err(_) => {
                debug!(action = action, time_stamp = %row.time_stamp, "Dropping row with unparseable timestamp");
                None
            }
        })
        .collect();

    Ok(transactions)
}

#[async_trait]
impl TransactionSource for EtherscanSource {
    fn name(&self) -> &'static str {
        "etherscan"
    }

    async fn normal_txs(&self, address: &Address, limit: usize) -> std::result::Result<Vec<Transaction>, SourceError> {
        self.fetch(ACTION_NORMAL, address, limit).await
    }

    async fn token_txs(&self, address: &Address, limit: usize) -> std::result::Result<Vec<Transaction>, SourceError> {
        self.fetch(ACTION_TOKEN, address, limit).await
    }
}
