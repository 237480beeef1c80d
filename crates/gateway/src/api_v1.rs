//! Versioned API (v1).
//!
//! ```text
//! POST /v1/chat              one gated chat turn
//! POST /v1/check             run the safety pipeline on a given candidate
//! GET  /v1/crisis-resources  contacts the UI must surface on crisis
//! ```

use crate::SharedState;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use bravomind_agent::TurnOutcome;
use bravomind_core::message::{Conversation, ConversationId, Message};
use bravomind_safety::ProcessedResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Sessions kept in memory before the least recently used is evicted.
const MAX_SESSIONS: usize = 10_000;

pub fn v1_router() -> Router<SharedState> {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/check", post(check_handler))
        .route("/crisis-resources", get(crisis_resources_handler))
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Missing or null is treated as empty text
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub outcome: TurnOutcome,
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub candidate: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisResourcesResponse {
    pub hotline: String,
    pub text_line: String,
    pub emergency: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let message = payload.message.unwrap_or_default();
    let session_id = payload
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| ConversationId::new().to_string());

    info!(session = %session_id, message_chars = message.chars().count(), "v1/chat request");

    // Snapshot history so no lock is held across the generator call.
    let history: Vec<Message> = {
        let sessions = state.sessions.read().await;
        sessions
            .get(&session_id)
            .map(|conv| conv.recent(state.history_window).to_vec())
            .unwrap_or_default()
    };

    let outcome = state
        .orchestrator
        .run_turn(&session_id, &message, &history)
        .await;

    {
        let mut sessions = state.sessions.write().await;
        if !sessions.contains_key(&session_id) && sessions.len() >= MAX_SESSIONS {
            evict_oldest(&mut sessions);
        }
        let conv = sessions
            .entry(session_id.clone())
            .or_insert_with(|| Conversation::with_id(ConversationId::from(&session_id)));
        conv.push(Message::user(message));
        conv.push(Message::assistant(outcome.result.final_response.clone()));
        conv.truncate_front(state.max_session_messages);
    }

    Json(ChatResponse {
        session_id,
        outcome,
    })
}

fn evict_oldest(sessions: &mut std::collections::HashMap<String, Conversation>) {
    let oldest = sessions
        .iter()
        .min_by_key(|(_, conv)| conv.updated_at)
        .map(|(id, _)| id.clone());
    if let Some(id) = oldest {
        debug!(session = %id, "Evicting idle session");
        sessions.remove(&id);
    }
}

async fn check_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CheckRequest>,
) -> Result<Json<ProcessedResult>, StatusCode> {
    if !state.enable_check_endpoint {
        return Err(StatusCode::NOT_FOUND);
    }

    let result = state
        .orchestrator
        .pipeline()
        .process_message_opt(payload.message.as_deref(), payload.candidate.as_deref());

    Ok(Json(result))
}

async fn crisis_resources_handler(State(state): State<SharedState>) -> Json<CrisisResourcesResponse> {
    let resources = state.orchestrator.pipeline().crisis_resources();
    Json(CrisisResourcesResponse {
        hotline: resources.hotline.clone(),
        text_line: resources.text_line.clone(),
        emergency: resources.emergency.clone(),
    })
}
