//! Interaction audit: structured records of turns that need follow-up.
//!
//! An entry is written whenever a turn's crisis severity is above `none`.
//! Entries never carry message text, only its length and the routing outcome.

use crate::crisis::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Entries kept in memory before the oldest are dropped.
const MAX_RETAINED: usize = 1_000;

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    pub severity: Severity,
    pub used_template: bool,
    /// Character count of the user message
    pub message_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Medium or high severity; crisis resources were shown
    CrisisDetected { escalate_to_human: bool },
    /// Low severity; supportive tone only
    SupportNeeded,
}

impl AuditEvent {
    pub fn for_severity(severity: Severity) -> Option<Self> {
        match severity {
            Severity::None => None,
            Severity::Low => Some(Self::SupportNeeded),
            Severity::Medium | Severity::High => Some(Self::CrisisDetected {
                escalate_to_human: severity == Severity::High,
            }),
        }
    }
}

/// Where audit entries are written.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Keeps the most recent entries in memory and forwards each to its sinks.
pub struct AuditLogger {
    entries: Mutex<VecDeque<AuditEntry>>,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entry_count", &self.count())
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            sinks,
        }
    }

    /// Record a turn. Severity `none` is not auditable and is ignored.
    pub fn log_interaction(&self, severity: Severity, used_template: bool, message_chars: usize) {
        let Some(event) = AuditEvent::for_severity(severity) else {
            return;
        };

        let entry = AuditEntry {
            timestamp: Utc::now(),
            event,
            severity,
            used_template,
            message_chars,
        };

        {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if entries.len() == MAX_RETAINED {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }

        for sink in &self.sinks {
            sink.record(&entry);
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Writes entries through `tracing::warn!` under the `audit` target.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::warn!(
            target: "audit",
            event = ?entry.event,
            severity = %entry.severity,
            used_template = entry.used_template,
            message_chars = entry.message_chars,
            guidance = entry.severity.guidance(),
            "AUDIT"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn none_severity_is_not_recorded() {
        let logger = AuditLogger::new();
        logger.log_interaction(Severity::None, false, 10);
        assert_eq!(logger.count(), 0);
    }

    #[test]
    fn events_follow_severity() {
        let logger = AuditLogger::new();
        logger.log_interaction(Severity::Low, false, 12);
        logger.log_interaction(Severity::High, true, 20);

        let entries = logger.entries();
        assert_eq!(entries[0].event, AuditEvent::SupportNeeded);
        assert_eq!(
            entries[1].event,
            AuditEvent::CrisisDetected { escalate_to_human: true }
        );
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn retention_is_bounded() {
        let logger = AuditLogger::new();
        for i in 0..(MAX_RETAINED + 5) {
            logger.log_interaction(Severity::Low, false, i);
        }
        assert_eq!(logger.count(), MAX_RETAINED);
        assert_eq!(logger.entries()[0].message_chars, 5);
    }

    #[test]
    fn custom_sink_receives_entries() {
        struct CountingSink(Arc<Mutex<Vec<Severity>>>);

        impl AuditSink for CountingSink {
            fn record(&self, entry: &AuditEntry) {
                self.0.lock().unwrap().push(entry.severity);
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let logger = AuditLogger::with_sinks(vec![Box::new(CountingSink(seen.clone()))]);
        logger.log_interaction(Severity::Medium, true, 30);

        assert_eq!(*seen.lock().unwrap(), vec![Severity::Medium]);
    }

    #[test]
    fn entry_serialization() {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event: AuditEvent::CrisisDetected { escalate_to_human: false },
            severity: Severity::Medium,
            used_template: true,
            message_chars: 42,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "crisis_detected");
        assert_eq!(json["severity"], "medium");
    }
}
