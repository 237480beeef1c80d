//! Scope classification: is a message within the veteran-wellness domain?
//!
//! The rule is `(relevant || general || mission) && !off_topic`: an off-topic
//! keyword vetoes the message even when relevant keywords are present.
//! Non-blank messages shorter than [`SHORT_MESSAGE_CHARS`] are always in
//! scope. A blank message has nothing to answer and is out of scope.

use crate::matcher::{KeywordMatcher, KeywordSet, normalize};
use bravomind_config::KeywordConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Trimmed messages shorter than this are too short to judge.
pub const SHORT_MESSAGE_CHARS: usize = 3;

/// Full breakdown of a scope decision, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeDecision {
    pub in_scope: bool,
    pub too_short: bool,
    pub has_relevant: bool,
    pub has_general: bool,
    pub has_mission: bool,
    /// The off-topic keyword that vetoed the message, if any
    pub off_topic_hit: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScopeClassifier {
    relevant: KeywordSet,
    general: KeywordSet,
    mission: KeywordSet,
    off_topic: KeywordSet,
    matcher: Arc<dyn KeywordMatcher>,
}

impl ScopeClassifier {
    pub fn new(keywords: &KeywordConfig, matcher: Arc<dyn KeywordMatcher>) -> Self {
        Self {
            relevant: KeywordSet::new("relevant", &keywords.relevant),
            general: KeywordSet::new("general", &keywords.general),
            mission: KeywordSet::new("mission", &keywords.mission),
            off_topic: KeywordSet::new("off_topic", &keywords.off_topic),
            matcher,
        }
    }

    pub fn classify(&self, message: &str) -> bool {
        self.explain(message).in_scope
    }

    pub fn explain(&self, message: &str) -> ScopeDecision {
        let text = normalize(message);

        if text.is_empty() {
            debug!("Blank message, out of scope");
            return ScopeDecision::default();
        }

        if text.chars().count() < SHORT_MESSAGE_CHARS {
            return ScopeDecision {
                in_scope: true,
                too_short: true,
                ..ScopeDecision::default()
            };
        }

        let has_relevant = self.matcher.matches(&text, &self.relevant);
        let has_general = self.matcher.matches(&text, &self.general);
        let has_mission = self.matcher.matches(&text, &self.mission);
        let off_topic_hit = self.matcher.find(&text, &self.off_topic).map(String::from);

        let in_scope = (has_relevant || has_general || has_mission) && off_topic_hit.is_none();

        debug!(
            in_scope,
            has_relevant,
            has_general,
            has_mission,
            off_topic = ?off_topic_hit,
            "Scope classified"
        );

        ScopeDecision {
            in_scope,
            too_short: false,
            has_relevant,
            has_general,
            has_mission,
            off_topic_hit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{SubstringMatcher, TokenMatcher};

    fn classifier() -> ScopeClassifier {
        ScopeClassifier::new(&KeywordConfig::default(), Arc::new(SubstringMatcher))
    }

    #[test]
    fn greeting_is_in_scope() {
        assert!(classifier().classify("hello"));
    }

    #[test]
    fn weather_question_is_out_of_scope() {
        let d = classifier().explain("what's the weather like today?");
        assert!(!d.in_scope);
        assert!(d.has_general);
        assert_eq!(d.off_topic_hit.as_deref(), Some("weather"));
    }

    #[test]
    fn off_topic_vetoes_relevant() {
        // "stress" is relevant but "bitcoin" is a hard veto
        assert!(!classifier().classify("my bitcoin losses are causing stress"));
    }

    #[test]
    fn relevant_topic_is_in_scope() {
        let d = classifier().explain("dealing with ptsd since deployment");
        assert!(d.in_scope);
        assert!(d.has_relevant);
    }

    #[test]
    fn mission_keyword_alone_is_enough() {
        let d = classifier().explain("objective complete");
        assert!(d.has_mission);
        assert!(d.in_scope);
    }

    #[test]
    fn short_messages_short_circuit() {
        let c = classifier();
        assert!(c.explain("k").too_short);
        assert!(c.classify("  ?? "));
    }

    #[test]
    fn blank_message_is_out_of_scope() {
        let c = classifier();
        for blank in ["", "   ", "\n\t"] {
            let d = c.explain(blank);
            assert!(!d.in_scope, "{blank:?}");
            assert!(!d.too_short);
        }
    }

    #[test]
    fn nothing_matched_is_out_of_scope() {
        assert!(!classifier().classify("zzzz qqqq"));
    }

    #[test]
    fn substring_imprecision_is_preserved() {
        // "code" hides inside "barcode"; substring matching vetoes it
        assert!(!classifier().classify("help me scan this barcode"));
    }

    #[test]
    fn token_matcher_fixes_embedded_hits() {
        let c = ScopeClassifier::new(&KeywordConfig::default(), Arc::new(TokenMatcher));
        assert!(c.classify("help me scan this barcode"));
    }
}
