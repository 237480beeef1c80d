//! The per-turn safety transaction.
//!
//! [`SafetyPipeline::process_message`] takes a user message and a candidate
//! reply and decides what the user actually sees:
//!
//! 1. classify scope and detect crisis on the user message
//! 2. out of scope → off-topic template
//! 3. crisis → crisis template, overwriting step 2
//! 4. otherwise a candidate that fails validation → off-topic template
//! 5. no template used → tone normalization of the candidate
//!
//! The reply is never empty, and `escalate_to_human` holds exactly when the
//! severity is `high`.

use crate::audit::{AuditLogger, TracingSink};
use crate::crisis::{CrisisDetector, CrisisResult, Severity};
use crate::error::SafetyError;
use crate::fallback::{FallbackBucket, FallbackResponder};
use crate::matcher::{KeywordMatcher, SubstringMatcher};
use crate::scope::{ScopeClassifier, ScopeDecision};
use crate::templates::{BoxedRng, DEFAULT_SUPPORT_MESSAGE, TemplateCategory, TemplateSelector, os_rng};
use crate::tone::ToneNormalizer;
use crate::validator::{ResponseValidator, Validation};
use bravomind_config::{AppConfig, CrisisResources};
use bravomind_core::message::Message;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Advisory flags for the UI and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub show_crisis_resources: bool,
    pub escalate_to_human: bool,
    pub log_interaction: bool,
}

impl Recommendations {
    fn for_crisis(crisis: CrisisResult) -> Self {
        Self {
            show_crisis_resources: crisis.is_crisis,
            escalate_to_human: crisis.severity == Severity::High,
            log_interaction: crisis.severity != Severity::None,
        }
    }
}

/// What the user sees for one turn, plus the routing facts behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedResult {
    pub is_valid: bool,
    pub final_response: String,
    pub crisis_detected: bool,
    pub crisis_severity: Severity,
    pub used_template: bool,
    pub recommendations: Recommendations,
}

impl ProcessedResult {
    /// A fixed reply that bypasses routing, such as the local rate-limit notice.
    ///
    /// No candidate was gated, so `is_valid` is always false.
    pub fn terminal(text: impl Into<String>, crisis: CrisisResult) -> Self {
        Self {
            is_valid: false,
            final_response: text.into(),
            crisis_detected: crisis.is_crisis,
            crisis_severity: crisis.severity,
            used_template: true,
            recommendations: Recommendations::for_crisis(crisis),
        }
    }
}

#[derive(Debug)]
pub struct SafetyPipeline {
    scope: ScopeClassifier,
    crisis: CrisisDetector,
    validator: ResponseValidator,
    tone: ToneNormalizer,
    templates: TemplateSelector,
    fallback: FallbackResponder,
    audit: AuditLogger,
    resources: CrisisResources,
}

impl SafetyPipeline {
    /// Substring matching, OS randomness, audit entries through `tracing`.
    pub fn from_config(config: &AppConfig) -> Result<Self, SafetyError> {
        Self::from_config_with(config, Arc::new(SubstringMatcher), os_rng())
    }

    /// Build with an explicit matcher and random source.
    ///
    /// The fallback responder gets its own generator seeded from `rng`, so a
    /// seeded `rng` makes every random choice in the pipeline reproducible.
    pub fn from_config_with(
        config: &AppConfig,
        matcher: Arc<dyn KeywordMatcher>,
        mut rng: BoxedRng,
    ) -> Result<Self, SafetyError> {
        let crisis_keywords = &config.keywords.crisis;
        for (tier, words) in [
            ("crisis.high", &crisis_keywords.high),
            ("crisis.medium", &crisis_keywords.medium),
            ("crisis.low", &crisis_keywords.low),
        ] {
            if words.iter().all(|w| w.trim().is_empty()) {
                return Err(SafetyError::EmptyKeywordSet(tier.to_string()));
            }
        }

        let fallback_rng: BoxedRng = Box::new(StdRng::from_rng(&mut rng));

        Ok(Self {
            scope: ScopeClassifier::new(&config.keywords, matcher.clone()),
            crisis: CrisisDetector::new(crisis_keywords, matcher.clone()),
            validator: ResponseValidator::new(),
            tone: ToneNormalizer::standard()?,
            templates: TemplateSelector::with_rng(config.templates.clone(), rng),
            fallback: FallbackResponder::new(crisis_keywords, matcher, fallback_rng),
            audit: AuditLogger::with_sinks(vec![Box::new(TracingSink)]),
            resources: config.crisis_resources.clone(),
        })
    }

    /// Replace the audit logger, e.g. to attach extra sinks.
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    pub fn process_message(&self, user_message: &str, candidate: &str) -> ProcessedResult {
        let in_scope = self.scope.classify(user_message);
        let crisis = self.crisis.detect(user_message);
        let verdict = self.validator.check(candidate);

        let mut final_response = candidate.to_string();
        let mut used_template = false;

        if !in_scope {
            final_response = self.templates.select(TemplateCategory::OffTopic);
            used_template = true;
        }

        if crisis.is_crisis {
            final_response = self.templates.select(TemplateCategory::Crisis);
            used_template = true;
        } else if !used_template && !verdict.is_valid() {
            debug!(verdict = ?verdict, "Candidate reply rejected");
            final_response = self.templates.select(TemplateCategory::OffTopic);
            used_template = true;
        }

        if !used_template {
            final_response = self.tone.enhance(&final_response);
        }

        if final_response.trim().is_empty() {
            final_response = DEFAULT_SUPPORT_MESSAGE.to_string();
        }

        let recommendations = Recommendations::for_crisis(crisis);
        if recommendations.log_interaction {
            self.audit.log_interaction(
                crisis.severity,
                used_template,
                user_message.chars().count(),
            );
        }

        info!(
            in_scope,
            severity = %crisis.severity,
            used_template,
            "Message processed"
        );

        ProcessedResult {
            is_valid: in_scope && verdict.is_valid(),
            final_response,
            crisis_detected: crisis.is_crisis,
            crisis_severity: crisis.severity,
            used_template,
            recommendations,
        }
    }

    /// Missing inputs are treated as empty text.
    pub fn process_message_opt(
        &self,
        user_message: Option<&str>,
        candidate: Option<&str>,
    ) -> ProcessedResult {
        self.process_message(
            user_message.unwrap_or_default(),
            candidate.unwrap_or_default(),
        )
    }

    pub fn classify(&self, message: &str) -> bool {
        self.scope.classify(message)
    }

    pub fn explain_scope(&self, message: &str) -> ScopeDecision {
        self.scope.explain(message)
    }

    pub fn detect(&self, message: &str) -> CrisisResult {
        self.crisis.detect(message)
    }

    pub fn check_candidate(&self, candidate: &str) -> Validation {
        self.validator.check(candidate)
    }

    pub fn select(&self, category: TemplateCategory) -> String {
        self.templates.select(category)
    }

    pub fn templates(&self) -> &TemplateSelector {
        &self.templates
    }

    /// Offline reply for when the generator is unavailable.
    pub fn fallback(&self, input: &str, history: &[Message]) -> String {
        self.fallback.generate(input, history)
    }

    pub fn fallback_bucket(&self, input: &str) -> FallbackBucket {
        self.fallback.bucket_for(input)
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub fn crisis_resources(&self) -> &CrisisResources {
        &self.resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditEntry, AuditSink};
    use crate::matcher::TokenMatcher;
    use std::sync::Mutex;

    fn pipeline() -> SafetyPipeline {
        SafetyPipeline::from_config_with(
            &AppConfig::default(),
            Arc::new(SubstringMatcher),
            Box::new(StdRng::seed_from_u64(99)),
        )
        .unwrap()
    }

    fn is_template(p: &SafetyPipeline, category: TemplateCategory, reply: &str) -> bool {
        p.templates().candidates(category).iter().any(|t| t == reply)
    }

    #[test]
    fn scenario_end_it_all_routes_to_crisis() {
        let p = pipeline();
        let r = p.process_message("I want to end it all", "Sounds like a plan, friend.");
        assert_eq!(r.crisis_severity, Severity::High);
        assert!(r.crisis_detected);
        assert!(r.used_template);
        assert!(r.final_response.contains("988"));
        assert!(is_template(&p, TemplateCategory::Crisis, &r.final_response));
        assert!(r.recommendations.show_crisis_resources);
        assert!(r.recommendations.escalate_to_human);
        assert!(r.recommendations.log_interaction);
    }

    #[test]
    fn scenario_weather_routes_to_off_topic() {
        let p = pipeline();
        let r = p.process_message("what's the weather like today?", "Sunny and 75.");
        assert!(!r.is_valid);
        assert!(r.used_template);
        assert!(!r.crisis_detected);
        assert!(is_template(&p, TemplateCategory::OffTopic, &r.final_response));
    }

    #[test]
    fn scenario_hello_gets_tone_pass() {
        let p = pipeline();
        let r = p.process_message("hello", "Hey friend, okay to talk?");
        assert!(r.is_valid);
        assert!(!r.used_template);
        assert_eq!(r.crisis_severity, Severity::None);
        assert_eq!(r.final_response, "Hey battle battle buddy, roger to talk?");
        assert!(!r.recommendations.log_interaction);
    }

    #[test]
    fn crisis_overrides_off_topic() {
        let p = pipeline();
        let r = p.process_message("bitcoin crashed and I want to die", "Buy the dip!");
        assert!(!r.is_valid);
        assert!(is_template(&p, TemplateCategory::Crisis, &r.final_response));
    }

    #[test]
    fn medium_severity_shows_resources_without_escalation() {
        let p = pipeline();
        let r = p.process_message("I feel hopeless", "Hang in there.");
        assert!(r.crisis_detected);
        assert_eq!(r.crisis_severity, Severity::Medium);
        assert!(r.recommendations.show_crisis_resources);
        assert!(!r.recommendations.escalate_to_human);
    }

    #[test]
    fn low_severity_keeps_live_reply() {
        let p = pipeline();
        let r = p.process_message("I've been lonely, need support", "We understand, buddy.");
        assert!(!r.crisis_detected);
        assert_eq!(r.crisis_severity, Severity::Low);
        assert!(!r.used_template);
        assert_eq!(r.final_response, "We copy that, battle buddy.");
        assert!(r.recommendations.log_interaction);
        assert!(!r.recommendations.show_crisis_resources);
    }

    #[test]
    fn invalid_candidate_routes_to_off_topic() {
        let p = pipeline();
        let r = p.process_message(
            "how do I manage stress?",
            "Here is some medical advice: double your medication dosage.",
        );
        assert!(!r.is_valid);
        assert!(r.used_template);
        assert!(is_template(&p, TemplateCategory::OffTopic, &r.final_response));
    }

    #[test]
    fn empty_candidate_never_reaches_user() {
        let p = pipeline();
        let r = p.process_message("help me with stress", "");
        assert!(r.used_template);
        assert!(!r.final_response.is_empty());
    }

    #[test]
    fn missing_inputs_are_coerced() {
        let p = pipeline();
        let r = p.process_message_opt(None, None);
        assert!(!r.final_response.is_empty());
        assert!(!r.crisis_detected);
        assert!(!r.is_valid);
        assert!(is_template(&p, TemplateCategory::OffTopic, &r.final_response));
    }

    #[test]
    fn templates_are_not_tone_rewritten() {
        let p = pipeline();
        for _ in 0..10 {
            let r = p.process_message("I want to die", "");
            // "battle buddy" would become "battle battle buddy" if rewritten
            assert!(!r.final_response.contains("battle battle"));
        }
    }

    #[test]
    fn reply_never_empty_and_escalation_tracks_high() {
        let p = pipeline();
        let users = [
            "", "hi", "ok", "hello", "suicide", "I'm worthless", "so sad",
            "tell me about movies", "ptsd from deployment", "zzzz", "   ",
        ];
        let candidates = ["", " ", "okay", "recipe for success", "We got it, friend."];
        for user in users {
            for candidate in candidates {
                let r = p.process_message(user, candidate);
                assert!(!r.final_response.trim().is_empty(), "{user:?} / {candidate:?}");
                assert_eq!(
                    r.recommendations.escalate_to_human,
                    r.crisis_severity == Severity::High
                );
                if r.crisis_detected {
                    assert!(r.used_template);
                    assert!(is_template(&p, TemplateCategory::Crisis, &r.final_response));
                }
            }
        }
    }

    #[test]
    fn seeded_pipelines_agree() {
        let a = pipeline();
        let b = pipeline();
        for _ in 0..5 {
            assert_eq!(
                a.process_message("tell me about movies", "x").final_response,
                b.process_message("tell me about movies", "x").final_response
            );
            assert_eq!(a.fallback("hey", &[]), b.fallback("hey", &[]));
        }
    }

    #[test]
    fn audit_records_only_flagged_turns() {
        struct Collect(Arc<Mutex<Vec<Severity>>>);
        impl AuditSink for Collect {
            fn record(&self, entry: &AuditEntry) {
                self.0.lock().unwrap().push(entry.severity);
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let p = pipeline().with_audit(AuditLogger::with_sinks(vec![Box::new(Collect(seen.clone()))]));

        p.process_message("hello", "hi there");
        p.process_message("feeling sad today", "I'm here.");
        p.process_message("I want to die", "");

        assert_eq!(*seen.lock().unwrap(), vec![Severity::Low, Severity::High]);
        assert_eq!(p.audit().count(), 2);
    }

    #[test]
    fn token_matcher_is_a_drop_in() {
        let p = SafetyPipeline::from_config_with(
            &AppConfig::default(),
            Arc::new(TokenMatcher),
            Box::new(StdRng::seed_from_u64(5)),
        )
        .unwrap();
        let r = p.process_message("how do I scan a barcode for the app?", "Open settings.");
        assert!(r.is_valid);
        assert!(!r.used_template);
    }

    #[test]
    fn empty_crisis_tier_is_rejected() {
        let mut config = AppConfig::default();
        config.keywords.crisis.high = vec!["  ".into()];
        let err = SafetyPipeline::from_config(&config).unwrap_err();
        assert!(matches!(err, SafetyError::EmptyKeywordSet(ref t) if t == "crisis.high"));
    }

    #[test]
    fn result_serializes_camel_case() {
        let r = pipeline().process_message("I feel hopeless", "");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["crisisSeverity"], "medium");
        assert_eq!(json["recommendations"]["showCrisisResources"], true);
        assert!(json["finalResponse"].is_string());
        assert!(json.get("usedTemplate").is_some());
    }
}
