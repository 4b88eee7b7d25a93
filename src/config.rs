//! Screening configuration.
//!
//! Defaults match the production limits. Values can come from a TOML file, from
//! environment variables, or both (env overrides file).
//!
//! Environment variables:
//! - `SCREEN_CONFIG_PATH`: optional TOML file loaded before env overrides
//! - `SCREEN_CALL_BUDGET`, `SCREEN_TX_LIMIT`, `SCREEN_NEIGHBOR_TX_LIMIT`
//! - `SCREEN_HOP1_LIMIT`, `SCREEN_HOP2_LIMIT`, `SCREEN_DELAY_MS`, `SCREEN_TIMEOUT_SECS`
//! - `DEMO_MODE=1` with `DEMO_GRAPH_PATH` selects the static graph source
//! - `ETHERSCAN_API_KEY`, `ETHERSCAN_BASE_URL`, `ETHERSCAN_CHAIN_ID` for the live source
//! - `BLACKLIST_PATH`: blacklist JSON file

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::error::{Result, ScreeningError};
use crate::result::ScanLimits;

pub const ENV_CONFIG_PATH: &str = "SCREEN_CONFIG_PATH";
pub const ENV_CALL_BUDGET: &str = "SCREEN_CALL_BUDGET";
pub const ENV_TX_LIMIT: &str = "SCREEN_TX_LIMIT";
pub const ENV_NEIGHBOR_TX_LIMIT: &str = "SCREEN_NEIGHBOR_TX_LIMIT";
pub const ENV_HOP1_LIMIT: &str = "SCREEN_HOP1_LIMIT";
pub const ENV_HOP2_LIMIT: &str = "SCREEN_HOP2_LIMIT";
pub const ENV_DELAY_MS: &str = "SCREEN_DELAY_MS";
pub const ENV_TIMEOUT_SECS: &str = "SCREEN_TIMEOUT_SECS";

pub const ENV_DEMO_MODE: &str = "DEMO_MODE";
pub const ENV_DEMO_GRAPH_PATH: &str = "DEMO_GRAPH_PATH";
pub const ENV_ETHERSCAN_API_KEY: &str = "ETHERSCAN_API_KEY";
pub const ENV_ETHERSCAN_BASE_URL: &str = "ETHERSCAN_BASE_URL";
pub const ENV_ETHERSCAN_CHAIN_ID: &str = "ETHERSCAN_CHAIN_ID";
pub const ENV_BLACKLIST_PATH: &str = "BLACKLIST_PATH";

pub const DEFAULT_ETHERSCAN_BASE_URL: &str = "https://api.etherscan.io/v2/api";
pub const DEFAULT_DEMO_GRAPH_PATH: &str = "demo/graph.json";
pub const DEFAULT_BLACKLIST_PATH: &str = "config/blacklist.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    /// The only chain with a live transaction source.
    pub live_chain: String,
    pub call_budget: u32,
    pub tx_scan_limit: usize,
    /// Per-address limit for hop-1 node fetches.
    pub neighbor_scan_limit: usize,
    pub hop1_limit: usize,
    pub hop2_per_hop1_limit: usize,
    pub inter_call_delay_ms: u64,
    pub scan_timeout_secs: Option<u64>,
    pub audit_logging: AuditLoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditLoggingConfig {
    pub enabled: bool,
    pub format: LogFormat,
    pub include_clean: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

impl Default for AuditLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::Json,
            include_clean: false,
        }
    }
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            live_chain: "ethereum".to_string(),
            call_budget: 20,
            tx_scan_limit: 200,
            neighbor_scan_limit: 50,
            hop1_limit: 10,
            hop2_per_hop1_limit: 5,
            inter_call_delay_ms: 250,
            scan_timeout_secs: None,
            audit_logging: AuditLoggingConfig::default(),
        }
    }
}

impl ScreeningConfig {
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ScreeningError::ConfigError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content).map_err(ScreeningError::TomlError)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ScreeningConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG_PATH) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(v) = parse_var(&lookup, ENV_CALL_BUDGET)? {
            config.call_budget = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_TX_LIMIT)? {
            config.tx_scan_limit = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_NEIGHBOR_TX_LIMIT)? {
            config.neighbor_scan_limit = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_HOP1_LIMIT)? {
            config.hop1_limit = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_HOP2_LIMIT)? {
            config.hop2_per_hop1_limit = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_DELAY_MS)? {
            config.inter_call_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_TIMEOUT_SECS)? {
            config.scan_timeout_secs = Some(v);
        }

        Ok(config)
    }

    pub fn limits(&self) -> ScanLimits {
        ScanLimits {
            call_budget: self.call_budget,
            tx_scan_limit: self.tx_scan_limit,
            neighbor_scan_limit: self.neighbor_scan_limit,
            hop1_limit: self.hop1_limit,
            hop2_per_hop1_limit: self.hop2_per_hop1_limit,
        }
    }

    pub fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.inter_call_delay_ms)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtherscanConfig {
    pub base_url: Url,
    pub api_key: String,
    pub chain_id: u64,
    pub timeout: Duration,
}

/// Which transaction source the screener is constructed with.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Etherscan(EtherscanConfig),
    StaticGraph { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub source: SourceKind,
    pub blacklist_path: PathBuf,
}

impl SourceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let demo_mode = lookup(ENV_DEMO_MODE).map(|v| v.trim() == "1").unwrap_or(false);

        let source = if demo_mode {
            SourceKind::StaticGraph {
                path: lookup(ENV_DEMO_GRAPH_PATH)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DEMO_GRAPH_PATH)),
            }
        } else {
            let api_key = lookup(ENV_ETHERSCAN_API_KEY)
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    ScreeningError::ConfigError(format!("{} is not set", ENV_ETHERSCAN_API_KEY))
                })?;
            let base_url = lookup(ENV_ETHERSCAN_BASE_URL)
                .unwrap_or_else(|| DEFAULT_ETHERSCAN_BASE_URL.to_string());
            let base_url = Url::parse(&base_url).map_err(|e| {
                ScreeningError::ConfigError(format!("Invalid {}: {}", ENV_ETHERSCAN_BASE_URL, e))
            })?;

            SourceKind::Etherscan(EtherscanConfig {
                base_url,
                api_key,
                chain_id: parse_var(&lookup, ENV_ETHERSCAN_CHAIN_ID)?.unwrap_or(1),
                timeout: Duration::from_secs(30),
            })
        };

        Ok(Self {
            source,
            blacklist_path: lookup(ENV_BLACKLIST_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BLACKLIST_PATH)),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ScreeningError::ConfigError(format!("Invalid {} '{}': {}", key, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ScreeningConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ScreeningConfig::default());
        assert_eq!(config.limits().hop1_limit, 10);
        assert_eq!(config.limits().hop2_per_hop1_limit, 5);
        assert_eq!(config.limits().tx_scan_limit, 200);
        assert_eq!(config.limits().call_budget, 20);
        assert_eq!(config.inter_call_delay(), Duration::from_millis(250));
        assert_eq!(config.scan_timeout(), None);
    }

    #[test]
    fn test_env_overrides() {
        let config = ScreeningConfig::from_lookup(lookup_from(&[
            (ENV_CALL_BUDGET, "8"),
            (ENV_HOP1_LIMIT, " 3 "),
            (ENV_DELAY_MS, "0"),
            (ENV_TIMEOUT_SECS, "45"),
        ]))
        .unwrap();
        assert_eq!(config.call_budget, 8);
        assert_eq!(config.hop1_limit, 3);
        assert_eq!(config.inter_call_delay_ms, 0);
        assert_eq!(config.scan_timeout(), Some(Duration::from_secs(45)));
        assert_eq!(config.tx_scan_limit, 200);
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = ScreeningConfig::from_lookup(lookup_from(&[(ENV_TX_LIMIT, "lots")])).unwrap_err();
        assert!(matches!(err, ScreeningError::ConfigError(msg) if msg.contains(ENV_TX_LIMIT)));
    }

    #[test]
    fn test_toml_partial_file_uses_defaults() {
        let config: ScreeningConfig = toml::from_str(
            r#"
            call_budget = 6
            hop2_per_hop1_limit = 2

            [audit_logging]
            format = "text"
            "#,
        )
        .unwrap();
        assert_eq!(config.call_budget, 6);
        assert_eq!(config.hop2_per_hop1_limit, 2);
        assert_eq!(config.hop1_limit, 10);
        assert_eq!(config.audit_logging.format, LogFormat::Text);
        assert!(config.audit_logging.enabled);
    }

    #[test]
    fn test_source_defaults_to_etherscan() {
        let config = SourceConfig::from_lookup(lookup_from(&[(ENV_ETHERSCAN_API_KEY, "key")])).unwrap();
        match config.source {
            SourceKind::Etherscan(etherscan) => {
                assert_eq!(etherscan.base_url.as_str(), DEFAULT_ETHERSCAN_BASE_URL);
                assert_eq!(etherscan.chain_id, 1);
                assert_eq!(etherscan.api_key, "key");
            }
            other => panic!("unexpected source {:?}", other),
        }
        assert_eq!(config.blacklist_path, PathBuf::from(DEFAULT_BLACKLIST_PATH));
    }

    #[test]
    fn test_live_source_requires_api_key() {
        assert!(SourceConfig::from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn test_demo_mode_selects_static_graph() {
        let config = SourceConfig::from_lookup(lookup_from(&[
            (ENV_DEMO_MODE, "1"),
            (ENV_DEMO_GRAPH_PATH, "fixtures/graph.json"),
        ]))
        .unwrap();
        assert_eq!(
            config.source,
            SourceKind::StaticGraph { path: PathBuf::from("fixtures/graph.json") }
        );
    }
}
