use std::sync::Arc;

use axum::{
    extract::State,
    http,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::cache::{CounterCache, CounterSnapshot};
use crate::engine::ChatEngine;
use crate::history;
use crate::store::{Counter, CounterStore};
use crate::types::Message;

/// Reply used when the request carries no usable message.
pub const EMPTY_REPLY: &str = "No message received";
/// Reply used when developer mode bypasses the completion path.
pub const DEVELOPER_MODE_REPLY: &str = "This is a default response in developer mode.";
/// Reply used when the upstream call fails.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error processing your request";

/// Shared application state for the HTTP API.
pub struct AppState {
    pub engine: ChatEngine,
    pub store: Arc<dyn CounterStore>,
    pub cache: CounterCache,
    pub history_limit: usize,
}

/// Request body for the chat endpoint. The widget has shipped two shapes
/// over time: the legacy single `message` string and the multi-turn
/// `messages` array; `history::normalize` reconciles them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub developer_mode: bool,
    #[serde(default)]
    pub language: Option<String>,
}

/// Response body for the chat endpoint.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Create the axum Router with all API routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(handle_chat))
        .route("/get_all_numbers", post(handle_all_numbers))
        .route("/get_sevy_educators_number", post(handle_educators_number))
        .route("/get_sevy_ai_answers", post(handle_ai_answers))
        .route("/get_students_taught", post(handle_students_taught))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::OPTIONS,
                ])
                .allow_headers([http::header::CONTENT_TYPE]),
        )
        .with_state(state)
}

/// POST /chat: relay one conversation window to the model.
async fn handle_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Json<ChatResponse> {
    if let Some(language) = req.language.as_deref() {
        // Language handling is delegated to the model via the persona;
        // the flag is kept on the wire for older widget builds.
        debug!("Front-end reported language: {language}");
    }

    if req.developer_mode {
        info!("Developer mode request, completion path bypassed");
        return reply(DEVELOPER_MODE_REPLY);
    }

    let window = match history::normalize(
        req.messages.as_deref(),
        req.message.as_deref(),
        state.history_limit,
    ) {
        Some(window) => window,
        None => return reply(EMPTY_REPLY),
    };

    info!("Chat request with {} turn(s)", window.len());

    match state.engine.reply(window).await {
        Ok(text) => Json(ChatResponse { reply: text }),
        Err(e) => {
            error!("Completion failed: {e}");
            reply(FALLBACK_REPLY)
        }
    }
}

fn reply(text: &str) -> Json<ChatResponse> {
    Json(ChatResponse {
        reply: text.to_string(),
    })
}

/// POST /get_all_numbers: combined counter snapshot.
async fn handle_all_numbers(State(state): State<Arc<AppState>>) -> Json<CounterSnapshot> {
    Json(state.cache.snapshot(state.store.as_ref()).await)
}

/// Legacy per-field variants of the combined endpoint, served from the
/// same cached snapshot.
async fn handle_educators_number(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    single_counter(&state, Counter::Educators).await
}

async fn handle_ai_answers(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    single_counter(&state, Counter::AiAnswers).await
}

async fn handle_students_taught(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    single_counter(&state, Counter::StudentsTaught).await
}

async fn single_counter(state: &AppState, counter: Counter) -> Json<serde_json::Value> {
    let snapshot = state.cache.snapshot(state.store.as_ref()).await;
    Json(json!({ (counter.field()): snapshot.get(counter) }))
}

/// GET /health
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

/// Start the HTTP server.
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP API listening on {addr}");
    axum::serve(listener, router).await?;
    Ok(())
}
