//! Configuration loading, validation, and management for Bravo Mind.
//!
//! Loads configuration from `~/.bravomind/config.toml` with environment
//! variable overrides. Validates all settings at startup. The keyword tables
//! and reply templates loaded here are read-only for the process lifetime.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.bravomind/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the text generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Generator endpoint
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Generation parameters, passed through to the generator untouched
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Admission control over outbound generation requests
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// How many prior turns are sent to the generator as context
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,

    /// System preamble settings
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Scope and crisis keyword tables
    #[serde(default)]
    pub keywords: KeywordConfig,

    /// Canned reply templates
    #[serde(default)]
    pub templates: TemplateConfig,

    /// Contact details surfaced when a crisis is detected
    #[serde(default)]
    pub crisis_resources: CrisisResources,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_max_history_messages() -> usize {
    6
}

fn default_true() -> bool {
    true
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("generation", &self.generation)
            .field("rate_limit", &self.rate_limit)
            .field("max_history_messages", &self.max_history_messages)
            .field("identity", &self.identity)
            .field("keywords", &self.keywords)
            .field("templates", &self.templates)
            .field("crisis_resources", &self.crisis_resources)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name used in logs
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// OpenAI-compatible base URL (without `/chat/completions`)
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_provider_name() -> String {
    "nvidia".into()
}
fn default_api_url() -> String {
    "https://integrate.api.nvidia.com/v1".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default)]
    pub stream: bool,

    /// Upper bound on a single generator call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "nvidia/llama-3.1-nemotron-70b-instruct".into()
}
fn default_max_tokens() -> u32 {
    300
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    1.0
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            stream: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Whether one admission window is shared by every caller or kept per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitScope {
    Global,
    PerSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length in milliseconds
    #[serde(default = "default_time_window")]
    pub time_window: u64,

    #[serde(default = "default_rate_limit_scope")]
    pub scope: RateLimitScope,
}

fn default_max_requests() -> usize {
    10
}
fn default_time_window() -> u64 {
    60_000
}
fn default_rate_limit_scope() -> RateLimitScope {
    RateLimitScope::Global
}

impl RateLimitConfig {
    pub fn window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.time_window)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            time_window: default_time_window(),
            scope: default_rate_limit_scope(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Replace the built-in battle-buddy preamble entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

/// Keyword tables for scope classification and the crisis cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default = "default_relevant")]
    pub relevant: Vec<String>,

    #[serde(default = "default_off_topic")]
    pub off_topic: Vec<String>,

    #[serde(default = "default_general")]
    pub general: Vec<String>,

    #[serde(default = "default_mission")]
    pub mission: Vec<String>,

    #[serde(default)]
    pub crisis: CrisisKeywords,
}

fn default_relevant() -> Vec<String> {
    strings(&[
        "stress", "anxiety", "depression", "ptsd", "mental health", "veteran",
        "military", "mission", "breathing", "gratitude", "sleep", "support",
        "buddy", "crisis", "help", "wellness", "therapy", "counseling",
        "bravo mind", "app", "feature", "rally point", "peer", "chat",
        "deployment", "service", "combat", "trauma", "adjustment", "transition",
        "family", "relationship", "anger", "isolation", "loneliness", "grief",
        "substance", "alcohol", "medication", "treatment", "recovery",
    ])
}

fn default_off_topic() -> Vec<String> {
    strings(&[
        "weather", "sports", "politics", "cooking", "movies", "music", "games",
        "programming", "code", "technology", "news", "celebrity", "shopping",
        "travel", "finance", "investment", "cryptocurrency", "bitcoin",
        "fashion", "cars", "real estate", "business", "marketing", "sales",
    ])
}

fn default_general() -> Vec<String> {
    strings(&[
        "hello", "hi", "hey", "how", "what", "when", "where", "why", "who",
        "help", "thanks", "thank you", "please", "sorry", "yes", "no",
        "okay", "ok", "good", "bad", "fine", "great", "terrible",
    ])
}

fn default_mission() -> Vec<String> {
    strings(&["mission", "operation", "mindshield", "task", "objective"])
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            relevant: default_relevant(),
            off_topic: default_off_topic(),
            general: default_general(),
            mission: default_mission(),
            crisis: CrisisKeywords::default(),
        }
    }
}

/// The three crisis tiers, highest severity first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisKeywords {
    /// Suicidal or self-harm phrases
    #[serde(default = "default_crisis_high")]
    pub high: Vec<String>,

    /// Hopelessness and giving-up phrases
    #[serde(default = "default_crisis_medium")]
    pub medium: Vec<String>,

    /// Sadness, isolation, overwhelm
    #[serde(default = "default_crisis_low")]
    pub low: Vec<String>,
}

fn default_crisis_high() -> Vec<String> {
    strings(&[
        "suicide", "kill myself", "end it all", "not worth living",
        "better off dead", "want to die", "ending my life",
    ])
}

fn default_crisis_medium() -> Vec<String> {
    strings(&[
        "hopeless", "can't go on", "giving up", "no point",
        "worthless", "burden", "everyone would be better",
    ])
}

fn default_crisis_low() -> Vec<String> {
    strings(&[
        "depressed", "sad", "lonely", "isolated", "struggling",
        "hard time", "difficult", "overwhelmed",
    ])
}

impl Default for CrisisKeywords {
    fn default() -> Self {
        Self {
            high: default_crisis_high(),
            medium: default_crisis_medium(),
            low: default_crisis_low(),
        }
    }
}

/// Canned replies per template category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_off_topic_templates")]
    pub off_topic: Vec<String>,

    #[serde(default = "default_crisis_templates")]
    pub crisis: Vec<String>,

    #[serde(default = "default_encouragement_templates")]
    pub encouragement: Vec<String>,
}

fn default_off_topic_templates() -> Vec<String> {
    strings(&[
        "I'm here to support you with Bravo Mind features and veteran mental wellness. Let's talk about your missions, how you're feeling, or how I can help you connect with fellow veterans. What's on your mind, battle buddy?",
        "My mission is to support veterans through Bravo Mind. How can I help you with your mental wellness journey or connect you with resources today?",
        "I'm focused on helping veterans like you through Bravo Mind's features. Want to talk about stress management, peer connections, or your daily wellness missions?",
    ])
}

fn default_crisis_templates() -> Vec<String> {
    strings(&[
        "I hear you're going through a tough time. If this is urgent, please reach out to the Veterans Crisis Line at 988 (Press 1) or text 838255. I'm here to support you, but professional help is important for serious situations.",
        "Your safety is the top priority. For immediate help: Veterans Crisis Line 988 (Press 1), Crisis Text 838255, or Emergency 911. I'm here to support you through this, battle buddy.",
        "I'm concerned about you. Please consider reaching out to professional support: Veterans Crisis Line 988 (Press 1). In the meantime, I'm here to help you through Bravo Mind's resources.",
    ])
}

fn default_encouragement_templates() -> Vec<String> {
    strings(&[
        "You're showing real strength by reaching out. That takes courage, warrior.",
        "Every small step forward is progress. You're doing better than you think.",
        "Your service matters, and so do you. We've got your back.",
        "It's okay to not be okay sometimes. What matters is that you're here, fighting.",
        "You've overcome challenges before. You have the strength to get through this too.",
    ])
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            off_topic: default_off_topic_templates(),
            crisis: default_crisis_templates(),
            encouragement: default_encouragement_templates(),
        }
    }
}

/// Crisis contacts the UI must surface when `showCrisisResources` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisResources {
    #[serde(default = "default_hotline")]
    pub hotline: String,

    #[serde(default = "default_text_line")]
    pub text_line: String,

    #[serde(default = "default_emergency")]
    pub emergency: String,
}

fn default_hotline() -> String {
    "988 (Press 1)".into()
}
fn default_text_line() -> String {
    "838255".into()
}
fn default_emergency() -> String {
    "911".into()
}

impl Default for CrisisResources {
    fn default() -> Self {
        Self {
            hotline: default_hotline(),
            text_line: default_text_line(),
            emergency: default_emergency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub allow_public_bind: bool,

    /// Per-session history kept in memory by the gateway
    #[serde(default = "default_max_session_messages")]
    pub max_session_messages: usize,

    /// Whether to expose `POST /v1/check`
    #[serde(default = "default_true")]
    pub enable_check_endpoint: bool,
}

fn default_port() -> u16 {
    42618
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_session_messages() -> usize {
    50
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allow_public_bind: false,
            max_session_messages: default_max_session_messages(),
            enable_check_endpoint: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.bravomind/config.toml).
    ///
    /// Also checks environment variables:
    /// - `BRAVOMIND_API_KEY` (highest priority)
    /// - `NVIDIA_API_KEY`
    /// - `BRAVOMIND_MODEL` overrides `generation.model`
    /// - `BRAVOMIND_TIMEOUT_SECS` overrides `generation.timeout_secs`
    /// - `BRAVOMIND_RATE_LIMIT_MAX` overrides `rate_limit.max_requests`
    ///
    /// The result is validated after the overrides are applied.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with(&config_path, |key| std::env::var(key).ok())
    }

    /// Load configuration from a specific file path, without environment
    /// overrides. A missing file yields the (validated) defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn load_with(
        path: &Path,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides(var)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            self.api_key = var("BRAVOMIND_API_KEY").or_else(|| var("NVIDIA_API_KEY"));
        }

        if let Some(model) = var("BRAVOMIND_MODEL") {
            self.generation.model = model;
        }

        if let Some(raw) = var("BRAVOMIND_TIMEOUT_SECS") {
            self.generation.timeout_secs = parse_env("BRAVOMIND_TIMEOUT_SECS", &raw)?;
        }

        if let Some(raw) = var("BRAVOMIND_RATE_LIMIT_MAX") {
            self.rate_limit.max_requests = parse_env("BRAVOMIND_RATE_LIMIT_MAX", &raw)?;
        }

        Ok(())
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".bravomind")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.generation;
        if !(0.0..=2.0).contains(&g.temperature) {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if g.top_p <= 0.0 || g.top_p > 1.0 {
            return Err(ConfigError::ValidationError(
                "generation.top_p must be in (0.0, 1.0]".into(),
            ));
        }
        if g.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "generation.model must not be empty".into(),
            ));
        }
        if g.stream {
            return Err(ConfigError::ValidationError(
                "generation.stream is not supported: every reply is validated as a whole".into(),
            ));
        }
        if g.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generation.timeout_secs must be > 0".into(),
            ));
        }

        if self.rate_limit.max_requests == 0 || self.rate_limit.time_window == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.max_requests and rate_limit.time_window must be > 0".into(),
            ));
        }

        if self.max_history_messages == 0 {
            return Err(ConfigError::ValidationError(
                "max_history_messages must be > 0".into(),
            ));
        }

        let crisis = &self.keywords.crisis;
        if crisis.high.is_empty() || crisis.medium.is_empty() || crisis.low.is_empty() {
            return Err(ConfigError::ValidationError(
                "keywords.crisis tiers must not be empty".into(),
            ));
        }

        if self.templates.crisis.is_empty() || self.templates.off_topic.is_empty() {
            return Err(ConfigError::ValidationError(
                "templates.crisis and templates.off_topic must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: ProviderConfig::default(),
            generation: GenerationConfig::default(),
            rate_limit: RateLimitConfig::default(),
            max_history_messages: default_max_history_messages(),
            identity: IdentityConfig::default(),
            keywords: KeywordConfig::default(),
            templates: TemplateConfig::default(),
            crisis_resources: CrisisResources::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("{key} must be a non-negative integer, got '{raw}'"))
    })
}

fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
