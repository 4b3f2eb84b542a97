//! End-to-end tests for the HTTP API: full router, mocked provider and store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use sevy_core::cache::CounterCache;
use sevy_core::config::Config;
use sevy_core::engine::ChatEngine;
use sevy_core::error::{ProviderError, StoreError};
use sevy_core::provider::LlmProvider;
use sevy_core::service::http::{create_router, AppState};
use sevy_core::store::memory::MemoryCounterStore;
use sevy_core::store::{Counter, CounterStore};
use sevy_core::types::{Message, Role};

/// Provider that records every window it receives and replies with a
/// fixed text. Call count doubles as a "was the completion path invoked"
/// assertion.
struct RecordingProvider {
    reply: String,
    calls: AtomicUsize,
    seen: Mutex<Vec<Message>>,
}

impl RecordingProvider {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmProvider for RecordingProvider {
    async fn chat(
        &self,
        messages: &[Message],
        _model: &str,
        _max_tokens: u32,
        _temperature: f64,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen.lock().unwrap() = messages.to_vec();
        Ok(self.reply.clone())
    }

    fn default_model(&self) -> &str {
        "test-model"
    }
}

/// Store where every operation fails.
struct DownStore;

#[async_trait]
impl CounterStore for DownStore {
    async fn fetch_all(&self) -> Result<HashMap<Counter, i64>, StoreError> {
        Err(StoreError::Connect("no route to host".to_string()))
    }

    async fn increment(&self, _counter: Counter) -> Result<(), StoreError> {
        Err(StoreError::Connect("no route to host".to_string()))
    }
}

/// Store that counts bulk fetches, for the cache properties.
struct CountingStore {
    inner: MemoryCounterStore,
    fetches: AtomicUsize,
}

#[async_trait]
impl CounterStore for CountingStore {
    async fn fetch_all(&self) -> Result<HashMap<Counter, i64>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_all().await
    }

    async fn increment(&self, counter: Counter) -> Result<(), StoreError> {
        self.inner.increment(counter).await
    }
}

fn app(provider: Arc<RecordingProvider>, store: Arc<dyn CounterStore>) -> axum::Router {
    let config = Config::default();
    let engine = ChatEngine::new(provider, store.clone(), &config);
    create_router(Arc::new(AppState {
        engine,
        store,
        cache: CounterCache::new(Duration::from_secs(config.cache_ttl_secs)),
        history_limit: config.history_limit,
    }))
}

async fn post_json(router: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_empty_request_yields_sentinel_without_completion_call() {
    let provider = RecordingProvider::new("should not be called");
    let router = app(provider.clone(), Arc::new(MemoryCounterStore::new()));

    for body in [
        json!({}),
        json!({"message": ""}),
        json!({"message": "   "}),
        json!({"message": "", "messages": []}),
    ] {
        let (status, reply) = post_json(&router, "/chat", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply, json!({"reply": "No message received"}));
    }

    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_legacy_message_normalizes_to_single_user_turn() {
    let provider = RecordingProvider::new("Chào bạn!");
    let router = app(provider.clone(), Arc::new(MemoryCounterStore::new()));

    let (status, reply) = post_json(&router, "/chat", json!({"message": "Xin chào"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({"reply": "Chào bạn!"}));

    let seen = provider.seen.lock().unwrap();
    // Persona first, then exactly the wrapped legacy message.
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].role, Role::System);
    assert_eq!(seen[1], Message::user("Xin chào"));
}

#[tokio::test]
async fn test_long_window_truncates_to_last_ten_turns() {
    let provider = RecordingProvider::new("ok");
    let router = app(provider.clone(), Arc::new(MemoryCounterStore::new()));

    let messages: Vec<Value> = (0..14)
        .map(|i| {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            json!({"role": role, "content": format!("turn {i}")})
        })
        .collect();
    let (status, _) = post_json(&router, "/chat", json!({ "messages": messages })).await;
    assert_eq!(status, StatusCode::OK);

    let seen = provider.seen.lock().unwrap();
    assert_eq!(seen.len(), 11);
    assert_eq!(seen[0].role, Role::System);
    assert_eq!(seen[1].content, "turn 4");
    assert_eq!(seen[10].content, "turn 13");
}

#[tokio::test]
async fn test_developer_mode_short_circuits_and_never_increments() {
    let provider = RecordingProvider::new("should not be called");
    let store = Arc::new(MemoryCounterStore::new());
    let router = app(provider.clone(), store.clone());

    let (status, reply) = post_json(
        &router,
        "/chat",
        json!({"message": "anything at all", "developerMode": true}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        reply,
        json!({"reply": "This is a default response in developer mode."})
    );

    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert!(store.fetch_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reply_has_bold_markers_stripped() {
    let provider = RecordingProvider::new("Hi there! **welcome**");
    let router = app(provider, Arc::new(MemoryCounterStore::new()));

    let (_, reply) = post_json(
        &router,
        "/chat",
        json!({"messages": [{"role": "user", "content": "Hello"}]}),
    )
    .await;
    assert_eq!(reply, json!({"reply": "Hi there! welcome"}));
}

#[tokio::test]
async fn test_successful_chat_increments_answer_counter() {
    let provider = RecordingProvider::new("ok");
    let store = Arc::new(MemoryCounterStore::new());
    let router = app(provider, store.clone());

    post_json(&router, "/chat", json!({"message": "hi"})).await;

    let counters = store.fetch_all().await.unwrap();
    assert_eq!(counters.get(&Counter::AiAnswers), Some(&1));
}

#[tokio::test]
async fn test_unreachable_store_yields_na_with_http_success() {
    let provider = RecordingProvider::new("ok");
    let router = app(provider, Arc::new(DownStore));

    let (status, body) = post_json(&router, "/get_all_numbers", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "sevy_educators_number": "N/A",
            "sevy_ai_answers": "N/A",
            "students_taught": "N/A",
        })
    );
}

#[tokio::test]
async fn test_counter_requests_within_ttl_hit_store_once() {
    let provider = RecordingProvider::new("ok");
    let store = Arc::new(CountingStore {
        inner: MemoryCounterStore::with_counts(&[
            (Counter::Educators, 4),
            (Counter::StudentsTaught, 250),
        ]),
        fetches: AtomicUsize::new(0),
    });
    let router = app(provider, store.clone());

    let (_, first) = post_json(&router, "/get_all_numbers", json!({})).await;
    let (_, second) = post_json(&router, "/get_all_numbers", json!({})).await;

    assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
    assert_eq!(first["sevy_educators_number"], 4);
    assert_eq!(first["students_taught"], 250);
    assert_eq!(first["sevy_ai_answers"], "N/A");
}

#[tokio::test]
async fn test_single_counter_endpoints_share_the_cached_snapshot() {
    let provider = RecordingProvider::new("ok");
    let store = Arc::new(CountingStore {
        inner: MemoryCounterStore::with_counts(&[(Counter::AiAnswers, 99)]),
        fetches: AtomicUsize::new(0),
    });
    let router = app(provider, store.clone());

    let (status, body) = post_json(&router, "/get_sevy_ai_answers", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"sevy_ai_answers": 99}));

    let (_, body) = post_json(&router, "/get_sevy_educators_number", json!({})).await;
    assert_eq!(body, json!({"sevy_educators_number": "N/A"}));

    let (_, body) = post_json(&router, "/get_students_taught", json!({})).await;
    assert_eq!(body, json!({"students_taught": "N/A"}));

    // All three were served from the snapshot fetched by the first call.
    assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_health_endpoint() {
    let provider = RecordingProvider::new("ok");
    let router = app(provider, Arc::new(MemoryCounterStore::new()));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}
