//! The screening decision handed back to the caller.
//!
//! Inside the crate every decision path carries its own [`ScreeningDetails`] variant.
//! At the serialization boundary the result is flattened into a [`ScreeningRecord`]
//! whose shape is the same for every path, so it can be stored as one log row.
//!
//! Invariants, enforced by the constructors:
//! - `status == Blacklisted` exactly when `direct_match`
//! - `one_hop_match` implies `status == Flagged`
//! - `Inconclusive` never carries a direct or one-hop match

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::blacklist::BlacklistEntry;
use crate::error::ScreeningError;
use crate::heuristics::HeuristicReport;

pub const REASON_BLACKLISTED: &str = "Address is in internal blacklist";
pub const REASON_UNSUPPORTED_CHAIN: &str = "Heuristic screening not supported for this chain";
pub const REASON_HOP1: &str = "1-hop link to internal blacklist";
pub const REASON_HOP2: &str = "2-hop link to internal blacklist";
pub const REASON_HEURISTICS: &str = "Heuristics triggered";
pub const REASON_CLEAN: &str = "No issues detected";
pub const REASON_BUDGET: &str = "call budget exceeded";
pub const REASON_RATE_LIMITED: &str = "provider rate limit reached";
pub const REASON_TIMEOUT: &str = "scan timed out";

/// Closed status vocabulary shared with external systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreeningStatus {
    Clean,
    Flagged,
    Blacklisted,
    Error,
    Inconclusive,
}

impl ScreeningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningStatus::Clean => "clean",
            ScreeningStatus::Flagged => "flagged",
            ScreeningStatus::Blacklisted => "blacklisted",
            ScreeningStatus::Error => "error",
            ScreeningStatus::Inconclusive => "inconclusive",
        }
    }
}

impl fmt::Display for ScreeningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured scan limits, echoed into every result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLimits {
    pub call_budget: u32,
    pub tx_scan_limit: usize,
    pub neighbor_scan_limit: usize,
    pub hop1_limit: usize,
    pub hop2_per_hop1_limit: usize,
}

/// Counters for a single invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub hop1_checked: usize,
    pub hop2_checked: usize,
    pub calls_used: u32,
}

/// One subject -> via -> hit path into the blacklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPath {
    pub from: Address,
    pub via: Address,
    pub hit: Address,
    pub hop: u8,
    pub category: String,
    pub note: Option<String>,
}

impl MatchPath {
    pub fn new(from: &Address, via: &Address, hop: u8, entry: &BlacklistEntry) -> Self {
        Self {
            from: from.clone(),
            via: via.clone(),
            hit: entry.address.clone(),
            hop,
            category: entry.category.clone(),
            note: entry.note.clone(),
        }
    }
}

/// Where an incomplete scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InconclusiveCause {
    Budget,
    Root,
    Hop1,
    Timeout,
}

impl InconclusiveCause {
    fn reason(&self) -> &'static str {
        match self {
            InconclusiveCause::Budget => REASON_BUDGET,
            InconclusiveCause::Root | InconclusiveCause::Hop1 => REASON_RATE_LIMITED,
            InconclusiveCause::Timeout => REASON_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreeningDetails {
    DirectMatch {
        entry: BlacklistEntry,
    },
    UnsupportedChain {
        chain: String,
    },
    Hop1Match {
        paths: Vec<MatchPath>,
        heuristics: HeuristicReport,
    },
    Hop2Match {
        paths: Vec<MatchPath>,
        heuristics: HeuristicReport,
    },
    HeuristicOnly {
        heuristics: HeuristicReport,
    },
    Inconclusive {
        cause: InconclusiveCause,
        node: Option<Address>,
        message: Option<String>,
    },
    ErrorResult {
        message: String,
    },
}

impl ScreeningDetails {
    pub fn kind(&self) -> &'static str {
        match self {
            ScreeningDetails::DirectMatch { .. } => "direct_match",
            ScreeningDetails::UnsupportedChain { .. } => "unsupported_chain",
            ScreeningDetails::Hop1Match { .. } => "hop1_match",
            ScreeningDetails::Hop2Match { .. } => "hop2_match",
            ScreeningDetails::HeuristicOnly { .. } => "heuristic_only",
            ScreeningDetails::Inconclusive { .. } => "inconclusive",
            ScreeningDetails::ErrorResult { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "ScreeningRecord")]
pub struct ScreeningResult {
    status: ScreeningStatus,
    reason: String,
    direct_match: bool,
    one_hop_match: bool,
    matched_blacklist_address: Option<Address>,
    raw_tx_count: usize,
    progress: ScanProgress,
    limits: ScanLimits,
    details: ScreeningDetails,
}

impl ScreeningResult {
    pub fn direct_match(address: &Address, entry: BlacklistEntry, limits: ScanLimits) -> Self {
        Self {
            status: ScreeningStatus::Blacklisted,
            reason: REASON_BLACKLISTED.to_string(),
            direct_match: true,
            one_hop_match: false,
            matched_blacklist_address: Some(address.clone()),
            raw_tx_count: 0,
            progress: ScanProgress::default(),
            limits,
            details: ScreeningDetails::DirectMatch { entry },
        }
    }

    pub fn unsupported_chain(chain: &str, limits: ScanLimits) -> Self {
        Self {
            status: ScreeningStatus::Clean,
            reason: REASON_UNSUPPORTED_CHAIN.to_string(),
            direct_match: false,
            one_hop_match: false,
            matched_blacklist_address: None,
            raw_tx_count: 0,
            progress: ScanProgress::default(),
            limits,
            details: ScreeningDetails::UnsupportedChain { chain: chain.to_string() },
        }
    }

    pub fn hop1_match(
        paths: Vec<MatchPath>,
        heuristics: HeuristicReport,
        progress: ScanProgress,
        limits: ScanLimits,
    ) -> Self {
        Self {
            status: ScreeningStatus::Flagged,
            reason: REASON_HOP1.to_string(),
            direct_match: false,
            one_hop_match: true,
            matched_blacklist_address: paths.first().map(|p| p.hit.clone()),
            raw_tx_count: heuristics.normal_tx_count,
            progress,
            limits,
            details: ScreeningDetails::Hop1Match { paths, heuristics },
        }
    }

    pub fn hop2_match(
        paths: Vec<MatchPath>,
        heuristics: HeuristicReport,
        progress: ScanProgress,
        limits: ScanLimits,
    ) -> Self {
        Self {
            status: ScreeningStatus::Flagged,
            reason: REASON_HOP2.to_string(),
            direct_match: false,
            one_hop_match: false,
            matched_blacklist_address: paths.first().map(|p| p.hit.clone()),
            raw_tx_count: heuristics.normal_tx_count,
            progress,
            limits,
            details: ScreeningDetails::Hop2Match { paths, heuristics },
        }
    }

    /// No blacklist linkage: heuristics alone decide between flagged and clean.
    pub fn heuristic_only(heuristics: HeuristicReport, progress: ScanProgress, limits: ScanLimits) -> Self {
        let (status, reason) = if heuristics.is_flagged() {
            (ScreeningStatus::Flagged, REASON_HEURISTICS)
        } else {
            (ScreeningStatus::Clean, REASON_CLEAN)
        };

        Self {
            status,
            reason: reason.to_string(),
            direct_match: false,
            one_hop_match: false,
            matched_blacklist_address: None,
            raw_tx_count: heuristics.normal_tx_count,
            progress,
            limits,
            details: ScreeningDetails::HeuristicOnly { heuristics },
        }
    }

    pub fn inconclusive(
        cause: InconclusiveCause,
        node: Option<Address>,
        message: Option<String>,
        raw_tx_count: usize,
        progress: ScanProgress,
        limits: ScanLimits,
    ) -> Self {
        Self {
            status: ScreeningStatus::Inconclusive,
            reason: cause.reason().to_string(),
            direct_match: false,
            one_hop_match: false,
            matched_blacklist_address: None,
            raw_tx_count,
            progress,
            limits,
            details: ScreeningDetails::Inconclusive { cause, node, message },
        }
    }

    /// The record a caller persists when the engine itself failed.
    pub fn from_error(error: &ScreeningError, limits: ScanLimits) -> Self {
        let message = error.to_string();
        Self {
            status: ScreeningStatus::Error,
            reason: message.clone(),
            direct_match: false,
            one_hop_match: false,
            matched_blacklist_address: None,
            raw_tx_count: 0,
            progress: ScanProgress::default(),
            limits,
            details: ScreeningDetails::ErrorResult { message },
        }
    }

    pub fn status(&self) -> ScreeningStatus {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_direct_match(&self) -> bool {
        self.direct_match
    }

    pub fn is_one_hop_match(&self) -> bool {
        self.one_hop_match
    }

    pub fn matched_blacklist_address(&self) -> Option<&Address> {
        self.matched_blacklist_address.as_ref()
    }

    pub fn raw_tx_count(&self) -> usize {
        self.raw_tx_count
    }

    pub fn progress(&self) -> ScanProgress {
        self.progress
    }

    pub fn limits(&self) -> ScanLimits {
        self.limits
    }

    pub fn details(&self) -> &ScreeningDetails {
        &self.details
    }

    pub fn paths(&self) -> &[MatchPath] {
        match &self.details {
            ScreeningDetails::Hop1Match { paths, .. } | ScreeningDetails::Hop2Match { paths, .. } => paths.as_slice(),
            _ => &[],
        }
    }

    pub fn to_record(&self) -> ScreeningRecord {
        ScreeningRecord::from(self.clone())
    }
}

/// Flat, stable schema of a screening log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    pub status: ScreeningStatus,
    pub reason: String,
    pub direct_match: bool,
    pub one_hop_match: bool,
    pub matched_blacklist_address: Option<String>,
    pub raw_tx_count: usize,
    pub details: DetailsRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsRecord {
    pub kind: String,
    pub hop1_checked: usize,
    pub hop2_checked: usize,
    pub calls_used: u32,
    pub limits: ScanLimits,
    #[serde(default)]
    pub paths: Vec<MatchPath>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<BlacklistEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<InconclusiveCause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heuristics: Option<HeuristicReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ScreeningResult> for ScreeningRecord {
    fn from(result: ScreeningResult) -> Self {
        let mut details = DetailsRecord {
            kind: result.details.kind().to_string(),
            hop1_checked: result.progress.hop1_checked,
            hop2_checked: result.progress.hop2_checked,
            calls_used: result.progress.calls_used,
            limits: result.limits,
            paths: Vec::new(),
            flags: Vec::new(),
            blacklist: None,
            chain: None,
            stopped_at: None,
            node: None,
            heuristics: None,
            error: None,
        };

        match result.details {
            ScreeningDetails::DirectMatch { entry } => details.blacklist = Some(entry),
            ScreeningDetails::UnsupportedChain { chain } => details.chain = Some(chain),
            ScreeningDetails::Hop1Match { paths, heuristics }
            | ScreeningDetails::Hop2Match { paths, heuristics } => {
                details.paths = paths;
                details.flags = heuristics.flag_messages();
                details.heuristics = Some(heuristics);
            }
            ScreeningDetails::HeuristicOnly { heuristics } => {
                details.flags = heuristics.flag_messages();
                details.heuristics = Some(heuristics);
            }
            ScreeningDetails::Inconclusive { cause, node, message } => {
                details.stopped_at = Some(cause);
                details.node = node;
                details.error = message;
            }
            ScreeningDetails::ErrorResult { message } => details.error = Some(message),
        }

        Self {
            status: result.status,
            reason: result.reason,
            direct_match: result.direct_match,
            one_hop_match: result.one_hop_match,
            matched_blacklist_address: result.matched_blacklist_address.map(String::from),
            raw_tx_count: result.raw_tx_count,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::HeuristicFlag;
    use crate::source::SourceError;

    const SUBJECT: &str = "0x1111111111111111111111111111111111111111";
    const VIA: &str = "0x2222222222222222222222222222222222222222";
    const HIT: &str = "0x3333333333333333333333333333333333333333";

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn limits() -> ScanLimits {
        ScanLimits {
            call_budget: 20,
            tx_scan_limit: 200,
            neighbor_scan_limit: 50,
            hop1_limit: 10,
            hop2_per_hop1_limit: 5,
        }
    }

    fn entry(address: &str) -> BlacklistEntry {
        BlacklistEntry {
            chain: "ethereum".into(),
            address: addr(address),
            category: "SANCTIONS".into(),
            note: Some("demo-seed".into()),
        }
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ScreeningStatus::Inconclusive).unwrap(), r#""inconclusive""#);
        assert_eq!(ScreeningStatus::Blacklisted.to_string(), "blacklisted");
    }

    #[test]
    fn test_direct_match_record() {
        let result = ScreeningResult::direct_match(&addr(SUBJECT), entry(SUBJECT), limits());
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "blacklisted");
        assert_eq!(json["direct_match"], true);
        assert_eq!(json["matched_blacklist_address"], SUBJECT);
        assert_eq!(json["details"]["kind"], "direct_match");
        assert_eq!(json["details"]["blacklist"]["category"], "SANCTIONS");
        assert_eq!(json["details"]["hop1_checked"], 0);
        assert_eq!(json["details"]["limits"]["hop1_limit"], 10);
    }

    #[test]
    fn test_hop2_match_record() {
        let paths = vec![MatchPath::new(&addr(SUBJECT), &addr(VIA), 2, &entry(HIT))];
        let progress = ScanProgress { hop1_checked: 1, hop2_checked: 3, calls_used: 4 };
        let result = ScreeningResult::hop2_match(paths, HeuristicReport::default(), progress, limits());

        assert_eq!(result.status(), ScreeningStatus::Flagged);
        assert!(!result.is_one_hop_match());
        assert_eq!(result.matched_blacklist_address(), Some(&addr(HIT)));

        let record = result.to_record();
        assert_eq!(record.details.kind, "hop2_match");
        assert_eq!(record.details.paths[0].via, addr(VIA));
        assert_eq!(record.details.hop2_checked, 3);
    }

    #[test]
    fn test_heuristic_only_decides_status() {
        let flagged = HeuristicReport {
            flags: vec![HeuristicFlag::OutgoingBurst],
            normal_tx_count: 12,
            ..Default::default()
        };
        let result = ScreeningResult::heuristic_only(flagged, ScanProgress::default(), limits());
        assert_eq!(result.status(), ScreeningStatus::Flagged);
        assert_eq!(result.reason(), REASON_HEURISTICS);
        assert_eq!(result.raw_tx_count(), 12);
        assert_eq!(result.to_record().details.flags, vec!["Outgoing burst: >=10 tx within 30 minutes"]);

        let clean = ScreeningResult::heuristic_only(HeuristicReport::default(), ScanProgress::default(), limits());
        assert_eq!(clean.status(), ScreeningStatus::Clean);
        assert_eq!(clean.reason(), REASON_CLEAN);
    }

    #[test]
    fn test_inconclusive_record_uses_where_key() {
        let result = ScreeningResult::inconclusive(
            InconclusiveCause::Hop1,
            Some(addr(VIA)),
            Some("Rate limited: slow down".into()),
            7,
            ScanProgress::default(),
            limits(),
        );
        assert_eq!(result.reason(), REASON_RATE_LIMITED);
        assert!(!result.is_direct_match() && !result.is_one_hop_match());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["details"]["where"], "hop1");
        assert_eq!(json["details"]["node"], VIA);
        assert_eq!(json["raw_tx_count"], 7);
    }

    #[test]
    fn test_error_record_carries_message() {
        let err = ScreeningError::from(SourceError::Provider("Etherscan HTTP 500".into()));
        let result = ScreeningResult::from_error(&err, limits());
        assert_eq!(result.status(), ScreeningStatus::Error);
        assert_eq!(result.reason(), "Transaction provider error: Provider error: Etherscan HTTP 500");
        assert_eq!(result.to_record().details.error.as_deref(), Some(result.reason()));
    }

    #[test]
    fn test_record_deserializes_back() {
        let result = ScreeningResult::unsupported_chain("solana", limits());
        let json = serde_json::to_string(&result).unwrap();
        let record: ScreeningRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, result.to_record());
        assert_eq!(record.details.chain.as_deref(), Some("solana"));
    }
}
