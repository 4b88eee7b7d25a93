use std::collections::HashSet;

use crate::address::Address;
use crate::source::Transaction;

/// Unique counterparties of a subject address, in first-seen order.
///
/// Membership is what matters for screening; the order is kept only so that
/// truncation and hop iteration are deterministic for identical provider data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterpartySet {
    ordered: Vec<Address>,
    seen: HashSet<Address>,
}

impl CounterpartySet {
    /// Collects the other side of every transaction in `lists` that involves `subject`.
    ///
    /// Self-loops, empty and malformed addresses are dropped.
    pub fn extract<'a, I>(subject: &Address, lists: I) -> Self
    where
        I: IntoIterator<Item = &'a [Transaction]>,
    {
        let mut set = Self::default();
        for tx in lists.into_iter().flatten() {
            let other = if tx.is_outgoing_from(subject) { &tx.to } else { &tx.from };
            if let Ok(address) = Address::parse(other) {
                if &address != subject {
                    set.insert(address);
                }
            }
        }
        set
    }

    pub fn insert(&mut self, address: Address) -> bool {
        if self.seen.insert(address.clone()) {
            self.ordered.push(address);
            true
        } else {
            false
        }
    }

    pub fn without(mut self, address: &Address) -> Self {
        if self.seen.remove(address) {
            self.ordered.retain(|a| a != address);
        }
        self
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.seen.contains(address)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// The first `limit` counterparties.
    pub fn truncated(&self, limit: usize) -> Vec<Address> {
        self.ordered.iter().take(limit).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.ordered.iter()
    }
}
