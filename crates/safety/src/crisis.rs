//! Crisis cascade: tiered keyword detection of self-harm risk language.
//!
//! Tiers are checked highest first and the first hit wins, so a lower tier
//! can never mask a higher one.

use crate::matcher::{KeywordMatcher, KeywordSet, normalize};
use bravomind_config::CrisisKeywords;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Crisis severity; the derived order is the routing priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Short operator-facing guidance for this severity.
    pub fn guidance(&self) -> &'static str {
        match self {
            Severity::High => "Immediate professional help recommended",
            Severity::Medium => "Professional support recommended",
            Severity::Low => "Supportive response needed",
            Severity::None => "No crisis indicators",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

/// Outcome of the cascade. `Low` signals a supportive tone, not escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisResult {
    pub is_crisis: bool,
    pub severity: Severity,
}

impl CrisisResult {
    pub const NONE: Self = Self {
        is_crisis: false,
        severity: Severity::None,
    };

    fn from_severity(severity: Severity) -> Self {
        Self {
            is_crisis: severity >= Severity::Medium,
            severity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrisisDetector {
    /// Ordered highest severity first.
    tiers: [(Severity, KeywordSet); 3],
    matcher: Arc<dyn KeywordMatcher>,
}

impl CrisisDetector {
    pub fn new(keywords: &CrisisKeywords, matcher: Arc<dyn KeywordMatcher>) -> Self {
        Self {
            tiers: [
                (Severity::High, KeywordSet::new("crisis.high", &keywords.high)),
                (Severity::Medium, KeywordSet::new("crisis.medium", &keywords.medium)),
                (Severity::Low, KeywordSet::new("crisis.low", &keywords.low)),
            ],
            matcher,
        }
    }

    pub fn detect(&self, message: &str) -> CrisisResult {
        let text = normalize(message);
        if text.is_empty() {
            return CrisisResult::NONE;
        }

        for (severity, set) in &self.tiers {
            if let Some(hit) = self.matcher.find(&text, set) {
                debug!(severity = %severity, keyword = hit, "Crisis tier matched");
                return CrisisResult::from_severity(*severity);
            }
        }

        CrisisResult::NONE
    }

    /// Keyword set for a tier; `None` severity has no keywords.
    pub fn tier(&self, severity: Severity) -> Option<&KeywordSet> {
        self.tiers
            .iter()
            .find(|(s, _)| *s == severity)
            .map(|(_, set)| set)
    }
}
