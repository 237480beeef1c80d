//! One user turn, end to end.
//!
//! Order of operations:
//!
//! 1. scope and crisis checks on the user message; a crisis or an
//!    out-of-scope message is answered from templates without touching the
//!    rate limiter or the generator
//! 2. admission through the [`RateLimiter`]; denial is terminal
//! 3. a single generator call bounded by `generation.timeout_secs`
//! 4. the reply (live, fallback, or a failure notice) goes through
//!    [`SafetyPipeline::process_message`]
//!
//! Every path ends in a displayable [`ProcessedResult`]; no error escapes.

use crate::context;
use bravomind_config::{AppConfig, GenerationConfig};
use bravomind_core::error::ProviderError;
use bravomind_core::message::Message;
use bravomind_core::provider::{Provider, ProviderRequest};
use bravomind_safety::{ProcessedResult, RateLimiter, SafetyPipeline};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const RATE_LIMITED_MESSAGE: &str = "I'm getting a lot of requests right now. Please wait a moment before sending another message, battle buddy.";

pub const AUTH_FAILURE_MESSAGE: &str =
    "I'm having trouble connecting to my systems right now. Please try again in a moment.";

pub const AT_CAPACITY_MESSAGE: &str = "I'm at capacity right now. Give me a moment to regroup, then we can continue our conversation.";

/// Which route produced the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Generator reply, gated by the pipeline
    Live,
    /// Crisis or off-topic template; the generator was never consulted
    Template,
    /// Offline decision-tree reply after a generator failure
    Fallback,
    /// Local admission control denied the turn
    RateLimited,
    /// The generator rejected our credentials
    AuthFailure,
    /// The generator answered 429
    AtCapacity,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub result: ProcessedResult,
    pub source: ResponseSource,
    /// Whole seconds until the limiter admits this session again; set only
    /// on [`ResponseSource::RateLimited`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

pub struct TurnOrchestrator {
    pipeline: Arc<SafetyPipeline>,
    limiter: Arc<RateLimiter>,
    /// `None` runs fully offline on fallback replies.
    provider: Option<Arc<dyn Provider>>,
    generation: GenerationConfig,
    system_prompt: String,
    max_history: usize,
}

impl std::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("model", &self.generation.model)
            .field("limiter", &self.limiter)
            .field("max_history", &self.max_history)
            .finish()
    }
}

impl TurnOrchestrator {
    pub fn new(
        config: &AppConfig,
        pipeline: Arc<SafetyPipeline>,
        provider: Option<Arc<dyn Provider>>,
    ) -> Self {
        Self {
            pipeline,
            limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
            provider,
            generation: config.generation.clone(),
            system_prompt: context::system_prompt(&config.identity),
            max_history: config.max_history_messages,
        }
    }

    /// Share a limiter across orchestrators.
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn pipeline(&self) -> &Arc<SafetyPipeline> {
        &self.pipeline
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn is_online(&self) -> bool {
        self.provider.is_some()
    }

    /// Run one turn for `session`. `history` holds the prior turns, oldest
    /// first, without the current message.
    pub async fn run_turn(&self, session: &str, user_message: &str, history: &[Message]) -> TurnOutcome {
        let in_scope = self.pipeline.classify(user_message);
        let crisis = self.pipeline.detect(user_message);

        if crisis.is_crisis || !in_scope {
            info!(
                session,
                in_scope,
                severity = %crisis.severity,
                "Turn answered without generation"
            );
            let candidate = self.pipeline.fallback(user_message, history);
            return TurnOutcome {
                result: self.pipeline.process_message(user_message, &candidate),
                source: ResponseSource::Template,
                retry_after_secs: None,
            };
        }

        let now = Instant::now();
        if !self.limiter.try_acquire_for(session, now) {
            let retry_after = self.limiter.retry_after(session, now);
            warn!(
                session,
                in_window = self.limiter.in_window(session, now),
                retry_after_ms = retry_after.map(|d| d.as_millis() as u64),
                "Local rate limit reached, generator skipped"
            );
            return TurnOutcome {
                result: ProcessedResult::terminal(RATE_LIMITED_MESSAGE, crisis),
                source: ResponseSource::RateLimited,
                retry_after_secs: retry_after.map(ceil_secs),
            };
        }

        let (candidate, source) = match self.generate(user_message, history).await {
            Ok(text) => (text, ResponseSource::Live),
            Err(err) => {
                warn!(session, error = %err, "Generator failed");
                self.failure_reply(&err, user_message, history)
            }
        };

        info!(session, source = ?source, "Turn complete");

        TurnOutcome {
            result: self.pipeline.process_message(user_message, &candidate),
            source,
            retry_after_secs: None,
        }
    }

    /// One generator call, no retry.
    async fn generate(&self, user_message: &str, history: &[Message]) -> Result<String, ProviderError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("no generator configured".into()))?;

        let request = ProviderRequest {
            model: self.generation.model.clone(),
            messages: context::build_messages(
                &self.system_prompt,
                history,
                user_message,
                self.max_history,
            ),
            temperature: self.generation.temperature,
            top_p: self.generation.top_p,
            max_tokens: Some(self.generation.max_tokens),
            stream: self.generation.stream,
        };

        let deadline = Duration::from_secs(self.generation.timeout_secs);
        let response = tokio::time::timeout(deadline, provider.complete(request))
            .await
            .map_err(|_| {
                ProviderError::Timeout(format!("no reply within {}s", deadline.as_secs()))
            })??;

        let text = response.message.content.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    fn failure_reply(
        &self,
        err: &ProviderError,
        user_message: &str,
        history: &[Message],
    ) -> (String, ResponseSource) {
        match err {
            ProviderError::AuthenticationFailed(_) => {
                (AUTH_FAILURE_MESSAGE.to_string(), ResponseSource::AuthFailure)
            }
            ProviderError::RateLimited { .. } => {
                (AT_CAPACITY_MESSAGE.to_string(), ResponseSource::AtCapacity)
            }
            ProviderError::Network(_)
            | ProviderError::Timeout(_)
            | ProviderError::ApiError { .. }
            | ProviderError::EmptyResponse
            | ProviderError::NotConfigured(_) => (
                self.pipeline.fallback(user_message, history),
                ResponseSource::Fallback,
            ),
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bravomind_config::RateLimitScope;
    use bravomind_core::message::Role;
    use bravomind_core::provider::ProviderResponse;
    use bravomind_safety::{Severity, SubstringMatcher, TemplateCategory};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with a fixed result, optionally after a delay, and records
    /// every request it sees.
    struct ScriptedProvider {
        reply: Result<String, ProviderError>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        last_request: Mutex<Option<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self::new(Ok(text.into())))
        }

        fn err(err: ProviderError) -> Arc<Self> {
            Arc::new(Self::new(Err(err)))
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay: Some(delay),
                ..Self::new(Ok("too late".into()))
            })
        }

        fn new(reply: Result<String, ProviderError>) -> Self {
            Self {
                reply,
                delay: None,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone().map(|text| ProviderResponse {
                message: Message::assistant(text),
                usage: None,
                model: "scripted-model".into(),
            })
        }
    }

    fn orchestrator_with(config: &AppConfig, provider: Option<Arc<ScriptedProvider>>) -> TurnOrchestrator {
        let pipeline = SafetyPipeline::from_config_with(
            config,
            Arc::new(SubstringMatcher),
            Box::new(StdRng::seed_from_u64(17)),
        )
        .unwrap();
        TurnOrchestrator::new(
            config,
            Arc::new(pipeline),
            provider.map(|p| p as Arc<dyn Provider>),
        )
    }

    fn orchestrator(provider: Arc<ScriptedProvider>) -> TurnOrchestrator {
        orchestrator_with(&AppConfig::default(), Some(provider))
    }

    #[tokio::test]
    async fn live_reply_gets_tone_pass() {
        let provider = ScriptedProvider::ok("Okay friend, let's try tactical breathing.");
        let turn = orchestrator(provider.clone());

        let out = turn.run_turn("s1", "help me with stress", &[]).await;

        assert_eq!(out.source, ResponseSource::Live);
        assert!(!out.result.used_template);
        assert_eq!(
            out.result.final_response,
            "roger battle battle buddy, let's try tactical breathing."
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn crisis_skips_generator_and_limiter() {
        let provider = ScriptedProvider::ok("unused");
        let turn = orchestrator(provider.clone());

        let out = turn.run_turn("s1", "I want to end it all", &[]).await;

        assert_eq!(out.source, ResponseSource::Template);
        assert_eq!(out.result.crisis_severity, Severity::High);
        assert!(out.result.final_response.contains("988"));
        assert!(out.result.recommendations.escalate_to_human);
        assert_eq!(provider.calls(), 0);
        assert_eq!(turn.limiter().in_window("s1", Instant::now()), 0);
    }

    #[tokio::test]
    async fn off_topic_skips_generator() {
        let provider = ScriptedProvider::ok("unused");
        let turn = orchestrator(provider.clone());

        let out = turn.run_turn("s1", "what's the weather like today?", &[]).await;

        assert_eq!(out.source, ResponseSource::Template);
        assert!(!out.result.is_valid);
        let off_topic = turn.pipeline().templates().candidates(TemplateCategory::OffTopic);
        assert!(off_topic.contains(&out.result.final_response));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn denied_turn_is_terminal() {
        let mut config = AppConfig::default();
        config.rate_limit.max_requests = 1;
        let provider = ScriptedProvider::ok("Here to help.");
        let turn = orchestrator_with(&config, Some(provider.clone()));

        let first = turn.run_turn("s1", "how do I sleep better", &[]).await;
        let second = turn.run_turn("s1", "how do I sleep better", &[]).await;

        assert_eq!(first.source, ResponseSource::Live);
        assert_eq!(second.source, ResponseSource::RateLimited);
        assert_eq!(second.result.final_response, RATE_LIMITED_MESSAGE);
        assert!(second.result.used_template);
        assert!(!second.result.is_valid);
        assert_eq!(provider.calls(), 1);

        // Default window is 60s and the slot was taken moments ago.
        let wait = second.retry_after_secs.unwrap();
        assert!(wait > 0 && wait <= 60, "retry after {wait}s");
        assert_eq!(first.retry_after_secs, None);
    }

    #[tokio::test]
    async fn global_bucket_is_shared_across_sessions() {
        let mut config = AppConfig::default();
        config.rate_limit.max_requests = 1;
        let turn = orchestrator_with(&config, Some(ScriptedProvider::ok("Copy.")));

        turn.run_turn("alpha", "hello", &[]).await;
        let out = turn.run_turn("bravo", "hello", &[]).await;
        assert_eq!(out.source, ResponseSource::RateLimited);
    }

    #[tokio::test]
    async fn per_session_buckets_are_isolated() {
        let mut config = AppConfig::default();
        config.rate_limit.max_requests = 1;
        config.rate_limit.scope = RateLimitScope::PerSession;
        let turn = orchestrator_with(&config, Some(ScriptedProvider::ok("Copy.")));

        assert_eq!(turn.run_turn("alpha", "hello", &[]).await.source, ResponseSource::Live);
        assert_eq!(turn.run_turn("bravo", "hello", &[]).await.source, ResponseSource::Live);
        assert_eq!(
            turn.run_turn("alpha", "hello", &[]).await.source,
            ResponseSource::RateLimited
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generator_times_out_to_fallback() {
        let provider = ScriptedProvider::slow(Duration::from_secs(3600));
        let turn = orchestrator(provider.clone());

        let out = turn.run_turn("s1", "help me with stress", &[]).await;

        assert_eq!(out.source, ResponseSource::Fallback);
        assert!(out.result.final_response.contains("tactical breathing"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn unreachable_generator_uses_fallback() {
        let turn = orchestrator(ScriptedProvider::err(ProviderError::Network(
            "connection refused".into(),
        )));
        let out = turn.run_turn("s1", "I keep having nightmares, any help?", &[]).await;
        assert_eq!(out.source, ResponseSource::Fallback);
        assert!(out.result.final_response.starts_with("Sleep protocol"));
    }

    #[tokio::test]
    async fn auth_failure_has_its_own_message() {
        let turn = orchestrator(ScriptedProvider::err(ProviderError::AuthenticationFailed(
            "bad key".into(),
        )));
        let out = turn.run_turn("s1", "hello", &[]).await;
        assert_eq!(out.source, ResponseSource::AuthFailure);
        assert_eq!(out.result.final_response, AUTH_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn upstream_429_reports_capacity() {
        let turn = orchestrator(ScriptedProvider::err(ProviderError::RateLimited {
            retry_after_secs: 5,
        }));
        let out = turn.run_turn("s1", "hello", &[]).await;
        assert_eq!(out.source, ResponseSource::AtCapacity);
        assert_eq!(out.result.final_response, AT_CAPACITY_MESSAGE);
    }

    #[tokio::test]
    async fn other_status_and_empty_reply_use_fallback() {
        for err in [
            ProviderError::ApiError {
                status_code: 503,
                message: "unavailable".into(),
            },
            ProviderError::EmptyResponse,
        ] {
            let turn = orchestrator(ScriptedProvider::err(err));
            let out = turn.run_turn("s1", "show me the dashboard", &[]).await;
            assert_eq!(out.source, ResponseSource::Fallback);
            assert!(out.result.final_response.contains("Command Center"));
        }

        let blank = orchestrator(ScriptedProvider::ok("   "));
        let out = blank.run_turn("s1", "show me the dashboard", &[]).await;
        assert_eq!(out.source, ResponseSource::Fallback);
    }

    #[tokio::test]
    async fn offline_orchestrator_uses_fallback() {
        let turn = orchestrator_with(&AppConfig::default(), None);
        assert!(!turn.is_online());
        let out = turn.run_turn("s1", "thank you", &[]).await;
        assert_eq!(out.source, ResponseSource::Fallback);
        assert!(out.result.final_response.starts_with("No need to thank me"));
    }

    #[tokio::test]
    async fn request_carries_preamble_history_and_options() {
        let provider = ScriptedProvider::ok("Copy.");
        let turn = orchestrator(provider.clone());
        let history: Vec<Message> = (0..10)
            .map(|i| Message::user(format!("earlier {i}")))
            .collect();

        turn.run_turn("s1", "hello again", &history).await;

        let request = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.messages.len(), 8);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.starts_with("You are BRAVO MIND"));
        assert_eq!(request.messages[1].content, "earlier 4");
        assert_eq!(request.messages[7].content, "hello again");
        assert_eq!(request.model, "nvidia/llama-3.1-nemotron-70b-instruct");
        assert_eq!(request.max_tokens, Some(300));
        assert!(!request.stream);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_turn_keeps_its_single_slot() {
        let provider = ScriptedProvider::slow(Duration::from_secs(3600));
        let turn = orchestrator(provider.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), turn.run_turn("s1", "hello", &[])).await;

        assert!(abandoned.is_err());
        assert_eq!(turn.limiter().in_window("s1", Instant::now()), 1);
    }

    #[tokio::test]
    async fn outcome_serializes_for_clients() {
        let turn = orchestrator(ScriptedProvider::ok("Copy that."));
        let out = turn.run_turn("s1", "hello", &[]).await;
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["source"], "live");
        assert!(json["result"]["finalResponse"].is_string());
        assert!(json.get("retryAfterSecs").is_none());
    }

    #[test]
    fn retry_seconds_round_up() {
        assert_eq!(ceil_secs(Duration::from_secs(40)), 40);
        assert_eq!(ceil_secs(Duration::from_millis(39_001)), 40);
        assert_eq!(ceil_secs(Duration::ZERO), 0);
    }
}
