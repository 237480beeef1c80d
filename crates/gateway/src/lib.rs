//! HTTP API gateway for Bravo Mind.
//!
//! Exposes the chat turn, an offline pipeline check, crisis resources, and a
//! health check. Conversation history lives in memory per session and is
//! lost on restart.
//!
//! Built on Axum.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, extract::State, response::Json, routing::get};
use bravomind_agent::TurnOrchestrator;
use bravomind_config::AppConfig;
use bravomind_core::error::{Error, Result};
use bravomind_core::message::Conversation;
use bravomind_safety::SafetyPipeline;
use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Request bodies above this size are rejected.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub sessions: RwLock<HashMap<String, Conversation>>,
    pub max_session_messages: usize,
    /// Prior messages handed to each turn.
    pub history_window: usize,
    pub enable_check_endpoint: bool,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(config: &AppConfig, orchestrator: Arc<TurnOrchestrator>) -> Self {
        Self {
            orchestrator,
            sessions: RwLock::new(HashMap::new()),
            max_session_messages: config.gateway.max_session_messages,
            history_window: config.max_history_messages,
            enable_check_endpoint: config.gateway.enable_check_endpoint,
            start_time: chrono::Utc::now(),
        }
    }
}

/// Build the full router: health check plus the v1 API.
///
/// Layers applied:
/// - CORS limited to local web front-ends
/// - Request body size limit (64 KB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://localhost:8080"),
        ]))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Refuse to listen on a non-loopback address unless explicitly allowed.
fn check_bind(host: &str, allow_public_bind: bool) -> Result<()> {
    let loopback = host == "localhost"
        || host
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback());
    if loopback || allow_public_bind {
        Ok(())
    } else {
        Err(Error::Config {
            message: format!(
                "refusing to bind to {host}: set gateway.allow_public_bind = true to expose the gateway"
            ),
        })
    }
}

/// Start the gateway HTTP server.
///
/// Without an API key the gateway still serves every turn, answering from
/// the offline fallback responder.
pub async fn start(config: AppConfig) -> Result<()> {
    check_bind(&config.gateway.host, config.gateway.allow_public_bind)?;
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let pipeline = Arc::new(SafetyPipeline::from_config(&config)?);
    let provider = match bravomind_providers::build_from_config(&config) {
        Ok(provider) => Some(provider),
        Err(e) => {
            warn!(error = %e, "Generator unavailable, serving fallback replies only");
            None
        }
    };
    let orchestrator = Arc::new(TurnOrchestrator::new(&config, pipeline, provider));
    let state = Arc::new(GatewayState::new(&config, orchestrator));

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    generator: &'static str,
    uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        generator: if state.orchestrator.is_online() {
            "online"
        } else {
            "offline"
        },
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn offline_state() -> SharedState {
        let config = AppConfig::default();
        let pipeline = Arc::new(SafetyPipeline::from_config(&config).unwrap());
        let orchestrator = Arc::new(TurnOrchestrator::new(&config, pipeline, None));
        Arc::new(GatewayState::new(&config, orchestrator))
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(offline_state());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["generator"], "offline");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let app = build_router(offline_state());
        let message = "a".repeat(MAX_BODY_BYTES + 1);
        let body = serde_json::json!({ "message": message }).to_string();

        let req = Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn public_bind_requires_opt_in() {
        assert!(check_bind("127.0.0.1", false).is_ok());
        assert!(check_bind("::1", false).is_ok());
        assert!(check_bind("localhost", false).is_ok());
        assert!(matches!(
            check_bind("0.0.0.0", false),
            Err(Error::Config { .. })
        ));
        assert!(check_bind("0.0.0.0", true).is_ok());
    }
}
