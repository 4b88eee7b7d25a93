use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::config::{AuditLoggingConfig, LogFormat};
use crate::result::{ScreeningRecord, ScreeningResult, ScreeningStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningEvent {
    pub timestamp: DateTime<Utc>,
    pub chain: String,
    pub address: String,
    pub source: String,
    pub record: ScreeningRecord,
}

impl ScreeningEvent {
    pub fn new(chain: &str, address: &Address, source: &str, result: &ScreeningResult) -> Self {
        Self {
            timestamp: Utc::now(),
            chain: chain.to_string(),
            address: address.to_string(),
            source: source.to_string(),
            record: result.to_record(),
        }
    }
}

pub struct AuditLogger {
    config: AuditLoggingConfig,
}

impl AuditLogger {
    pub fn new(config: AuditLoggingConfig) -> Self {
        Self { config }
    }

    pub fn log_event(&self, event: ScreeningEvent) {
        if !self.config.enabled {
            return;
        }

        if event.record.status == ScreeningStatus::Clean && !self.config.include_clean {
            return;
        }

        match self.config.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Text => self.log_text(event),
        }
    }

    fn log_json(&self, event: ScreeningEvent) {
        let json = serde_json::to_string(&event)
            .unwrap_or_else(|e| format!(r#"{{"error": "Failed to serialize: {}"}}"#, e));

        emit(event.record.status, &json);
    }

    fn log_text(&self, event: ScreeningEvent) {
        let matched = event
            .record
            .matched_blacklist_address
            .as_deref()
            .unwrap_or("-");
        let message = format!(
            "[{}] {} - {}:{} | {} | matched: {} | hop1: {} hop2: {} calls: {} | source: {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.record.status,
            event.chain,
            event.address,
            event.record.reason,
            matched,
            event.record.details.hop1_checked,
            event.record.details.hop2_checked,
            event.record.details.calls_used,
            event.source
        );

        emit(event.record.status, &message);
    }
}

// tracing targets must be compile-time constants
fn emit(status: ScreeningStatus, message: &str) {
    match status {
        ScreeningStatus::Blacklisted | ScreeningStatus::Error => {
            tracing::error!(target: "screening_audit", "{}", message)
        }
        ScreeningStatus::Flagged | ScreeningStatus::Inconclusive => {
            tracing::warn!(target: "screening_audit", "{}", message)
        }
        ScreeningStatus::Clean => {
            tracing::info!(target: "screening_audit", "{}", message)
        }
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(AuditLoggingConfig::default())
    }
}
