//! Conversational safety and routing pipeline for Bravo Mind.
//!
//! Every user message and every candidate reply passes through here before
//! anything reaches the user:
//!
//! - **Scope**: is the message within the veteran-wellness domain?
//! - **Crisis**: tiered keyword cascade producing a [`Severity`]
//! - **Validation**: does the candidate reply contain disallowed content?
//! - **Tone**: rewrite generic vocabulary into the battle-buddy house style
//! - **Templates / fallback**: canned replies when a live reply is unavailable
//!   or not permitted
//! - **Rate limiting**: sliding-window admission control over generation
//! - **Audit**: structured logging of interactions that need follow-up
//!
//! Classification is deterministic keyword matching behind the
//! [`KeywordMatcher`] trait; there is no statistical model.

pub mod audit;
pub mod crisis;
pub mod error;
pub mod fallback;
pub mod matcher;
pub mod pipeline;
pub mod rate_limit;
pub mod scope;
pub mod templates;
pub mod tone;
pub mod validator;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditSink, TracingSink};
pub use crisis::{CrisisDetector, CrisisResult, Severity};
pub use error::SafetyError;
pub use fallback::{FallbackBucket, FallbackResponder, FallbackRule};
pub use matcher::{KeywordMatcher, KeywordSet, SubstringMatcher, TokenMatcher};
pub use pipeline::{ProcessedResult, Recommendations, SafetyPipeline};
pub use rate_limit::RateLimiter;
pub use scope::{ScopeClassifier, ScopeDecision};
pub use templates::{BoxedRng, TemplateCategory, TemplateSelector, DEFAULT_SUPPORT_MESSAGE};
pub use tone::ToneNormalizer;
pub use validator::{ResponseValidator, Validation};
