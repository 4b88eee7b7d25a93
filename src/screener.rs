//! Screening orchestrator.
//!
//! Decision order, first terminal state wins:
//!
//! ```text
//! Direct ──hit──> blacklisted
//!   │
//! UnsupportedChain ──> clean ("not supported")
//!   │
//! RootFetch ──budget/rate limit──> inconclusive
//!   │            └─provider error──> Err
//! Hop1Check ──hit──> flagged (one_hop_match)
//!   │
//! Hop2Loop ──budget/rate limit──> inconclusive
//!   │      └─hit──> flagged
//! Decision ──> flagged (heuristics) | clean
//! ```
//!
//! The screener keeps no state between calls. Budget counters live in a [`ScanState`]
//! created per invocation.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::audit_logger::{AuditLogger, ScreeningEvent};
use crate::blacklist::{normalize_chain, BlacklistStore, MemoryBlacklist};
use crate::budget::{CallBudget, PAIRED_FETCH_COST};
use crate::config::{ScreeningConfig, SourceConfig};
use crate::counterparty::CounterpartySet;
use crate::error::{Result, ScreeningError};
use crate::heuristics::HeuristicReport;
use crate::result::{InconclusiveCause, MatchPath, ScanProgress, ScreeningResult};
use crate::source::{self, SourceError, Transaction, TransactionSource};

/// Counters for one screening invocation.
#[derive(Debug)]
struct ScanState {
    budget: CallBudget,
    hop1_checked: usize,
    hop2_checked: usize,
    raw_tx_count: usize,
}

impl ScanState {
    fn new(ceiling: u32) -> Self {
        Self {
            budget: CallBudget::new(ceiling),
            hop1_checked: 0,
            hop2_checked: 0,
            raw_tx_count: 0,
        }
    }

    fn progress(&self) -> ScanProgress {
        ScanProgress {
            hop1_checked: self.hop1_checked,
            hop2_checked: self.hop2_checked,
            calls_used: self.budget.used(),
        }
    }
}

pub struct Screener {
    source: Arc<dyn TransactionSource>,
    blacklist: Arc<dyn BlacklistStore>,
    config: ScreeningConfig,
    audit_logger: Arc<AuditLogger>,
}

impl Screener {
    pub fn builder() -> ScreenerBuilder {
        ScreenerBuilder::new()
    }

    /// Builds a screener from `SCREEN_*`, `DEMO_*`, `ETHERSCAN_*` and `BLACKLIST_PATH`.
    pub fn from_env() -> Result<Self> {
        let config = ScreeningConfig::from_env()?;
        let sources = SourceConfig::from_env()?;

        let blacklist = MemoryBlacklist::load_from_file(&sources.blacklist_path)?;
        let source = source::from_kind(&sources.source)?;

        ScreenerBuilder::new()
            .with_config(config)
            .with_source(source)
            .with_blacklist(Arc::new(blacklist))
            .build()
    }

    pub fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    /// Screens an already validated address on `chain`.
    ///
    /// Rate limiting and budget exhaustion come back as `Ok` with an inconclusive
    /// status. Root fetch provider errors and blacklist store errors are returned as
    /// `Err`; [`Screener::error_result`] turns them into the record to persist.
    pub async fn screen(&self, chain: &str, address: &Address) -> Result<ScreeningResult> {
        let chain = normalize_chain(chain);
        let outcome = self.run(&chain, address).await;

        let logged = match &outcome {
            Ok(result) => result.clone(),
            Err(e) => {
                warn!(chain = %chain, address = %address, error = %e, "Screening failed");
                self.error_result(e)
            }
        };
        self.audit_logger
            .log_event(ScreeningEvent::new(&chain, address, self.source.name(), &logged));

        outcome
    }

    pub fn error_result(&self, error: &ScreeningError) -> ScreeningResult {
        ScreeningResult::from_error(error, self.config.limits())
    }

    async fn run(&self, chain: &str, address: &Address) -> Result<ScreeningResult> {
        let limits = self.config.limits();

        if let Some(entry) = self.blacklist.find_direct(chain, address).await? {
            info!(chain = %chain, address = %address, category = %entry.category, "Direct blacklist match");
            return Ok(ScreeningResult::direct_match(address, entry, limits));
        }

        if chain != normalize_chain(&self.config.live_chain) {
            debug!(chain = %chain, "Chain has no live transaction source");
            return Ok(ScreeningResult::unsupported_chain(chain, limits));
        }

        let mut state = ScanState::new(self.config.call_budget);
        let Some(timeout) = self.config.scan_timeout() else {
            return self.scan(chain, address, &mut state).await;
        };

        let outcome = tokio::time::timeout(timeout, self.scan(chain, address, &mut state)).await;
        match outcome {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(address = %address, timeout_secs = timeout.as_secs(), "Screening scan timed out");
                Ok(ScreeningResult::inconclusive(
                    InconclusiveCause::Timeout,
                    None,
                    None,
                    state.raw_tx_count,
                    state.progress(),
                    limits,
                ))
            }
        }
    }

    async fn scan(&self, chain: &str, address: &Address, state: &mut ScanState) -> Result<ScreeningResult> {
        let limits = self.config.limits();

        if !state.budget.try_charge(PAIRED_FETCH_COST) {
            info!(address = %address, ceiling = state.budget.ceiling(), "Call budget too small for root fetch");
            return Ok(ScreeningResult::inconclusive(
                InconclusiveCause::Budget,
                None,
                None,
                0,
                state.progress(),
                limits,
            ));
        }

        let (normal, token) = match self.fetch_pair(address, self.config.tx_scan_limit).await {
            Ok(pair) => pair,
            Err(SourceError::RateLimited(message)) => {
                warn!(address = %address, "Rate limited during root fetch");
                return Ok(ScreeningResult::inconclusive(
                    InconclusiveCause::Root,
                    None,
                    Some(message),
                    0,
                    state.progress(),
                    limits,
                ));
            }
            Err(e) => return Err(e.into()),
        };

        state.raw_tx_count = normal.len();
        let heuristics = HeuristicReport::evaluate(address, &normal, &token);

        let hop1 = CounterpartySet::extract(address, [normal.as_slice(), token.as_slice()])
            .truncated(self.config.hop1_limit);
        state.hop1_checked = hop1.len();

        if !hop1.is_empty() {
            let hits = self.blacklist.find_any(chain, &hop1).await?;
            if !hits.is_empty() {
                info!(address = %address, hits = hits.len(), "1-hop blacklist link");
                let paths = hits
                    .iter()
                    .map(|entry| MatchPath::new(address, &entry.address, 1, entry))
                    .collect();
                return Ok(ScreeningResult::hop1_match(paths, heuristics, state.progress(), limits));
            }
        }

        for node in &hop1 {
            if !state.budget.try_charge(PAIRED_FETCH_COST) {
                info!(
                    address = %address,
                    node = %node,
                    calls_used = state.budget.used(),
                    remaining = state.budget.remaining(),
                    "Call budget exhausted during hop-2 scan"
                );
                return Ok(ScreeningResult::inconclusive(
                    InconclusiveCause::Budget,
                    Some(node.clone()),
                    None,
                    state.raw_tx_count,
                    state.progress(),
                    limits,
                ));
            }

            let fetched = self.fetch_pair(node, self.config.neighbor_scan_limit).await;
            if let Err(SourceError::RateLimited(message)) = &fetched {
                warn!(address = %address, node = %node, "Rate limited during hop-2 scan");
                return Ok(ScreeningResult::inconclusive(
                    InconclusiveCause::Hop1,
                    Some(node.clone()),
                    Some(message.clone()),
                    state.raw_tx_count,
                    state.progress(),
                    limits,
                ));
            }
            self.pause().await;

            let (node_normal, node_token) = match fetched {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(node = %node, error = %e, "Skipping hop-1 node after provider error");
                    continue;
                }
            };

            let hop2 = CounterpartySet::extract(node, [node_normal.as_slice(), node_token.as_slice()])
                .without(address)
                .truncated(self.config.hop2_per_hop1_limit);
            state.hop2_checked += hop2.len();
            if hop2.is_empty() {
                continue;
            }

            let hits = self.blacklist.find_any(chain, &hop2).await?;
            if !hits.is_empty() {
                info!(address = %address, via = %node, hits = hits.len(), "2-hop blacklist link");
                let paths = hits
                    .iter()
                    .map(|entry| MatchPath::new(address, node, 2, entry))
                    .collect();
                return Ok(ScreeningResult::hop2_match(paths, heuristics, state.progress(), limits));
            }
        }

        let result = ScreeningResult::heuristic_only(heuristics, state.progress(), limits);
        info!(
            address = %address,
            status = %result.status(),
            hop1_checked = state.hop1_checked,
            hop2_checked = state.hop2_checked,
            calls_used = state.budget.used(),
            "No blacklist linkage found"
        );
        Ok(result)
    }

    /// Fetches normal and token transactions concurrently.
    ///
    /// When both calls fail, a rate limit takes precedence over a generic error.
    async fn fetch_pair(
        &self,
        address: &Address,
        limit: usize,
    ) -> std::result::Result<(Vec<Transaction>, Vec<Transaction>), SourceError> {
        debug!(source = self.source.name(), address = %address, limit = limit, "Fetching transactions");

        let (normal, token) = tokio::join!(
            self.source.normal_txs(address, limit),
            self.source.token_txs(address, limit)
        );

        match (normal, token) {
            (Ok(normal), Ok(token)) => Ok((normal, token)),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(normal_err), Err(token_err)) => {
                if token_err.is_rate_limited() {
                    Err(token_err)
                } else {
                    Err(normal_err)
                }
            }
        }
    }

    async fn pause(&self) {
        let delay = self.config.inter_call_delay();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`Screener`]. The transaction source is chosen here, once.
pub struct ScreenerBuilder {
    source: Option<Arc<dyn TransactionSource>>,
    blacklist: Option<Arc<dyn BlacklistStore>>,
    config: ScreeningConfig,
    audit_logger: Option<Arc<AuditLogger>>,
}

impl ScreenerBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            blacklist: None,
            config: ScreeningConfig::default(),
            audit_logger: None,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn TransactionSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_blacklist(mut self, blacklist: Arc<dyn BlacklistStore>) -> Self {
        self.blacklist = Some(blacklist);
        self
    }

    pub fn with_config(mut self, config: ScreeningConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_audit_logger(mut self, logger: Arc<AuditLogger>) -> Self {
        self.audit_logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<Screener> {
        let source = self
            .source
            .ok_or_else(|| ScreeningError::ConfigError("No transaction source configured".to_string()))?;
        let blacklist = self
            .blacklist
            .ok_or_else(|| ScreeningError::ConfigError("No blacklist store configured".to_string()))?;

        let audit_logger = self
            .audit_logger
            .unwrap_or_else(|| Arc::new(AuditLogger::new(self.config.audit_logging.clone())));

        Ok(Screener {
            source,
            blacklist,
            config: self.config,
            audit_logger,
        })
    }
}

impl Default for ScreenerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
