//! Behavioural signals computed over the subject's own transaction history.
//!
//! - Outgoing burst: any 10 consecutive outgoing transactions (by sorted timestamp)
//!   spanning at most 30 minutes.
//! - Many counterparties: at least 25 unique counterparties in normal transactions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::counterparty::CounterpartySet;
use crate::source::Transaction;

pub const BURST_WINDOW_TXS: usize = 10;
pub const BURST_WINDOW_SECS: u64 = 30 * 60;
pub const MANY_COUNTERPARTIES: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeuristicFlag {
    OutgoingBurst,
    ManyCounterparties { count: usize },
}

impl fmt::Display for HeuristicFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeuristicFlag::OutgoingBurst => write!(
                f,
                "Outgoing burst: >={} tx within {} minutes",
                BURST_WINDOW_TXS,
                BURST_WINDOW_SECS / 60
            ),
            HeuristicFlag::ManyCounterparties { count } => write!(
                f,
                "Many counterparties in last txs: >={} ({})",
                MANY_COUNTERPARTIES, count
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicReport {
    pub normal_tx_count: usize,
    pub token_tx_count: usize,
    pub outgoing_count: usize,
    pub incoming_count: usize,
    pub unique_counterparties: usize,
    pub flags: Vec<HeuristicFlag>,
}

impl HeuristicReport {
    pub fn evaluate(subject: &Address, normal: &[Transaction], token: &[Transaction]) -> Self {
        let outgoing: Vec<u64> = normal
            .iter()
            .filter(|tx| tx.is_outgoing_from(subject))
            .map(|tx| tx.timestamp)
            .collect();
        let incoming_count = normal.iter().filter(|tx| tx.is_incoming_to(subject)).count();
        let unique_counterparties = CounterpartySet::extract(subject, [normal]).len();

        let mut flags = Vec::new();
        if has_burst(&outgoing) {
            flags.push(HeuristicFlag::OutgoingBurst);
        }
        if unique_counterparties >= MANY_COUNTERPARTIES {
            flags.push(HeuristicFlag::ManyCounterparties { count: unique_counterparties });
        }

        Self {
            normal_tx_count: normal.len(),
            token_tx_count: token.len(),
            outgoing_count: outgoing.len(),
            incoming_count,
            unique_counterparties,
            flags,
        }
    }

    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }

    pub fn flag_messages(&self) -> Vec<String> {
        self.flags.iter().map(ToString::to_string).collect()
    }
}

/// Sliding window over ascending timestamps; raw provider order is not trusted.
fn has_burst(timestamps: &[u64]) -> bool {
    if timestamps.len() < BURST_WINDOW_TXS {
        return false;
    }
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    sorted
        .windows(BURST_WINDOW_TXS)
        .any(|window| window[BURST_WINDOW_TXS - 1] - window[0] <= BURST_WINDOW_SECS)
}
