//! HTTP API gateway for Clerk.
//!
//! Exposes the chat endpoint, the visible chat history and a health check.
//!
//! Built on Axum for high performance async HTTP.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Query};
use axum::response::{IntoResponse, Response};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use clerk_agent::{TurnError, TurnOutcome, TurnRequest, TurnRunner};
use clerk_config::AppConfig;
use clerk_core::message::{ContentBlock, ConversationId, Message};
use clerk_core::TranscriptStore;
use clerk_transcript::CsvTranscriptStore;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub runner: Arc<TurnRunner>,

    /// Conversation listed by the history endpoint when the request names none
    pub history_conversation_id: Option<ConversationId>,
}

impl GatewayState {
    pub fn new(runner: Arc<TurnRunner>) -> Self {
        Self {
            runner,
            history_conversation_id: None,
        }
    }

    pub fn with_history_conversation(mut self, id: Option<ConversationId>) -> Self {
        self.history_conversation_id = id;
        self
    }
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Permissive CORS
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/messages", get(history_handler))
        .route("/api/messages/", get(history_handler))
        .route("/", post(chat_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Fails before binding when no completion API key is configured.
pub async fn start(config: AppConfig) -> clerk_core::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = clerk_providers::build_from_config(&config)?;
    let transcript: Arc<dyn TranscriptStore> = Arc::new(CsvTranscriptStore::new(
        config.transcript.path.clone(),
        config.retry.policy(),
    ));
    let runner = Arc::new(clerk_agent::build_runner(&config, provider, transcript));

    let state = Arc::new(
        GatewayState::new(runner).with_history_conversation(
            config
                .gateway
                .history_conversation_id
                .clone()
                .map(ConversationId::from),
        ),
    );
    let app = build_router(state);

    info!(
        addr = %addr,
        transcript = %config.transcript.path.display(),
        model = %config.model,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Errors ---

/// A failed request, rendered as `{"error": ..., "kind": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request",
            message: message.into(),
        }
    }
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        let status = match &e {
            TurnError::Completion(_) => StatusCode::BAD_GATEWAY,
            TurnError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TurnError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(rename = "conversationId")]
    conversation_id: Option<String>,
}

#[derive(Serialize)]
struct HistoryResponse {
    messages: Vec<Message>,
}

/// User messages and final assistant answers, oldest first.
async fn history_handler(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let scope = query
        .conversation_id
        .filter(|id| !id.trim().is_empty())
        .map(ConversationId::from)
        .or_else(|| state.history_conversation_id.clone());

    let transcript = state.runner.transcript();
    let messages = match &scope {
        Some(id) => transcript.conversation(id).await,
        None => transcript.all().await,
    }
    .map_err(|e| {
        error!(error = %e, "Failed to read chat history");
        ApiError::from(TurnError::from(e))
    })?;

    Ok(Json(HistoryResponse {
        messages: messages
            .into_iter()
            .filter(Message::is_visible_chat)
            .collect(),
    }))
}

#[derive(Deserialize)]
struct ChatRequest {
    message: IncomingMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomingMessage {
    content: Vec<ContentBlock>,
    conversation_id: String,
    message_id: String,
}

#[derive(Serialize)]
struct ChatResponse {
    message: Message,
}

async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(ChatRequest { message: incoming }) =
        payload.map_err(|e| ApiError::invalid_request(e.body_text()))?;

    if incoming.conversation_id.trim().is_empty() {
        return Err(ApiError::invalid_request("conversationId must not be empty"));
    }
    if incoming.message_id.trim().is_empty() {
        return Err(ApiError::invalid_request("messageId must not be empty"));
    }

    info!(
        conversation_id = %incoming.conversation_id,
        message_id = %incoming.message_id,
        blocks = incoming.content.len(),
        "Chat message received"
    );

    let request = TurnRequest {
        conversation_id: ConversationId::from(incoming.conversation_id),
        message_id: incoming.message_id,
        content: incoming.content,
    };

    match state.runner.run_turn(request).await {
        Ok(TurnOutcome::Answered(message)) => Ok(Json(ChatResponse { message })),
        Ok(TurnOutcome::RoundLimitReached { rounds, .. }) => Err(ApiError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            kind: "max_rounds_reached",
            message: format!("No final answer after {rounds} completion rounds"),
        }),
        Err(e) => {
            warn!(kind = e.kind(), error = %e, "Turn failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use clerk_agent::CompletionClient;
    use clerk_core::error::ProviderError;
    use clerk_core::message::ToolCall;
    use clerk_core::provider::{AssistantReply, Completion, CompletionRequest, FinishReason, Provider};
    use clerk_core::{AgentProfile, RetryPolicy, ToolRegistry};
    use clerk_transcript::InMemoryTranscriptStore;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    /// Always answers with the same completion, or always fails.
    struct FixedProvider(Result<Completion, ProviderError>);

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<Completion, ProviderError> {
            self.0.clone()
        }
    }

    fn answer(text: &str) -> Result<Completion, ProviderError> {
        Ok(Completion {
            finish_reason: FinishReason::Stop,
            message: AssistantReply {
                content: Some(text.into()),
                tool_calls: vec![],
            },
            model: "mock".into(),
            usage: None,
        })
    }

    fn test_state(
        reply: Result<Completion, ProviderError>,
        store: Arc<InMemoryTranscriptStore>,
    ) -> SharedState {
        let completion = CompletionClient::new(Arc::new(FixedProvider(reply)), "mock", vec![])
            .with_retry(RetryPolicy::once());
        let runner = TurnRunner::new(
            completion,
            Arc::new(ToolRegistry::new()),
            store,
            AgentProfile::default(),
        );
        Arc::new(GatewayState::new(Arc::new(runner)))
    }

    fn chat_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn order_question() -> Value {
        json!({
            "message": {
                "content": [{"type": "text", "text": "Show me order 37077"}],
                "conversationId": "c1",
                "messageId": "m1"
            }
        })
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(answer("hi"), Arc::new(InMemoryTranscriptStore::new())));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn chat_returns_assistant_message() {
        let store = Arc::new(InMemoryTranscriptStore::new());
        let app = build_router(test_state(answer("Here are the results"), store.clone()));

        let response = app.oneshot(chat_request(order_question())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["message"]["role"], "assistant");
        assert_eq!(
            body["message"]["content"],
            json!([{"type": "text", "text": "Here are the results"}])
        );
        assert_eq!(body["message"]["conversation_id"], "c1");
        assert!(body["message"].get("tool_calls").is_none());

        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn empty_content_is_bad_request() {
        let store = Arc::new(InMemoryTranscriptStore::new());
        let app = build_router(test_state(answer("unused"), store.clone()));

        let body = json!({"message": {"content": [], "conversationId": "c1", "messageId": "m1"}});
        let response = app.oneshot(chat_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["kind"], "invalid_request");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let app = build_router(test_state(answer("unused"), Arc::new(InMemoryTranscriptStore::new())));

        let response = app
            .oneshot(chat_request(json!({"message": {"content": "not a list"}})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "invalid_request");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn completion_failure_is_bad_gateway() {
        let reply = Err(ProviderError::ApiError {
            status_code: 500,
            message: "upstream down".into(),
        });
        let app = build_router(test_state(reply, Arc::new(InMemoryTranscriptStore::new())));

        let response = app.oneshot(chat_request(order_question())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "completion_service");
        assert!(body["error"].as_str().unwrap().contains("upstream down"));
    }

    #[tokio::test]
    async fn round_limit_is_unprocessable() {
        let reply = Ok(Completion {
            finish_reason: FinishReason::ToolCalls,
            message: AssistantReply {
                content: None,
                tool_calls: vec![ToolCall {
                    id: "call_1".into(),
                    name: "get_all_orders_data".into(),
                    arguments: "{}".into(),
                }],
            },
            model: "mock".into(),
            usage: None,
        });
        let app = build_router(test_state(reply, Arc::new(InMemoryTranscriptStore::new())));

        let response = app.oneshot(chat_request(order_question())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["kind"], "max_rounds_reached");
    }

    async fn seeded_store() -> Arc<InMemoryTranscriptStore> {
        let store = Arc::new(InMemoryTranscriptStore::new());
        let c1 = ConversationId::from("c1");
        let c2 = ConversationId::from("c2");
        let call = ToolCall {
            id: "call_1".into(),
            name: "get_all_orders_data".into(),
            arguments: "{}".into(),
        };
        for m in [
            Message::system(c1.clone(), "rules"),
            Message::user(c1.clone(), "m1", vec![ContentBlock::text("orders?")]),
            Message::assistant(c1.clone(), None, vec![call]),
            Message::tool_result(c1.clone(), "call_1", "[]"),
            Message::assistant(c1.clone(), Some("No orders.".into()), vec![]),
            Message::system(c2.clone(), "rules"),
            Message::user(c2, "m9", vec![ContentBlock::text("hello")]),
        ] {
            store.append(&m).await.unwrap();
        }
        store
    }

    async fn history(state: SharedState, uri: &str) -> Vec<Value> {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = build_router(state).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["messages"]
            .as_array()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn history_hides_system_and_tool_traffic() {
        let state = test_state(answer("unused"), seeded_store().await);

        let messages = history(state, "/api/messages/?conversationId=c1").await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["content"][0]["text"], "No orders.");
    }

    #[tokio::test]
    async fn history_scope_falls_back_to_configured_conversation() {
        let store = seeded_store().await;

        let everything = history(test_state(answer("unused"), store.clone()), "/api/messages/").await;
        assert_eq!(everything.len(), 3);

        let runner = test_state(answer("unused"), store).runner.clone();
        let state = Arc::new(
            GatewayState::new(runner).with_history_conversation(Some(ConversationId::from("c2"))),
        );
        let scoped = history(state, "/api/messages/").await;
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0]["message_id"], "m9");
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let app = build_router(test_state(answer("unused"), Arc::new(InMemoryTranscriptStore::new())));
        let huge = "x".repeat(2 * 1024 * 1024);
        let body = json!({
            "message": {
                "content": [{"type": "text", "text": huge}],
                "conversationId": "c1",
                "messageId": "m1"
            }
        });
        let response = app.oneshot(chat_request(body)).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn start_without_api_key_fails_before_binding() {
        let mut config = AppConfig::default();
        config.gateway.port = 0;

        let err = start(config).await.unwrap_err();
        assert!(matches!(
            err,
            clerk_core::Error::Provider(ProviderError::NotConfigured(_))
        ));
    }
}
