//! Blockchain address screening against an internal blacklist.
//!
//! Given a chain and an address, the [`Screener`] decides whether the address is
//! blacklisted, one or two transaction hops away from a blacklisted address, or
//! only trips behavioural heuristics. External provider calls are bounded by a
//! per-invocation budget, and provider rate limiting ends the scan as `inconclusive`.

pub mod address;
pub mod audit_logger;
pub mod blacklist;
pub mod budget;
pub mod config;
pub mod counterparty;
pub mod error;
pub mod heuristics;
pub mod result;
pub mod screener;
pub mod source;

// Re-export main types for convenience
pub use address::{Address, ValidationError};
pub use audit_logger::{AuditLogger, ScreeningEvent};
pub use blacklist::{BlacklistEntry, BlacklistStore, MemoryBlacklist, StoreError};
pub use config::{ScreeningConfig, SourceConfig, SourceKind};
pub use error::{Result, ScreeningError};
pub use result::{ScreeningDetails, ScreeningRecord, ScreeningResult, ScreeningStatus};
pub use screener::{Screener, ScreenerBuilder};
pub use source::{SourceError, Transaction, TransactionSource};
