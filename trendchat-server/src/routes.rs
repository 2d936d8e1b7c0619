//! HTTP routes for the Trendchat server.
//!
//! `POST /` carries the whole chat surface: a `clear` flag resets the
//! session's conversation, otherwise `user_input` starts one streaming
//! exchange answered as SSE. `/autocomplete` and `/search-volume` are
//! independent side-channels; `/health` reports liveness.

use axum::{
    Json, Router,
    extract::{Form, Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use trendchat_core::providers::LlmProvider;
use trendchat_core::relay::ChatRelay;
use trendchat_core::store::{DEFAULT_SESSION, SessionStore};
use trendchat_core::suggest::SuggestClient;
use trendchat_core::trends::InterestSource;
use trendchat_core::types::Message;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub relay: ChatRelay,
    pub sessions: SessionStore,
    pub suggest: SuggestClient,
    pub interest: Arc<dyn InterestSource>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        interest: Arc<dyn InterestSource>,
        suggest: SuggestClient,
        llm: &trendchat_core::config::LlmConfig,
    ) -> Self {
        Self {
            relay: ChatRelay::new(provider, Arc::clone(&interest), llm),
            sessions: SessionStore::new(),
            suggest,
            interest,
        }
    }
}

/// Form body for the chat endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatForm {
    pub user_input: Option<String>,
    pub clear: Option<String>,
    pub session_id: Option<String>,
}

/// Chat endpoint: clear the session or stream one exchange.
async fn chat_handler(State(state): State<AppState>, Form(form): Form<ChatForm>) -> Response {
    let session_id = form
        .session_id
        .unwrap_or_else(|| DEFAULT_SESSION.to_string());

    if form.clear.is_some() {
        state.sessions.clear(&session_id).await;
        info!(session = %session_id, "Conversation cleared");
        return Json(json!({"status": "cleared"})).into_response();
    }

    let Some(user_input) = form.user_input else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": "missing user_input"})),
        )
            .into_response();
    };

    let conversation = state.sessions.conversation(&session_id);
    conversation.lock().await.push(Message::user(user_input));

    let events = state.relay.spawn(conversation);
    let stream = ReceiverStream::new(events)
        .map(|event| Ok::<Event, Infallible>(Event::default().data(event.sse_payload())));
    Sse::new(stream).into_response()
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
    #[serde(default)]
    pub q: String,
}

/// Autocomplete side-channel; any fetcher failure degrades to `[]`.
async fn autocomplete_handler(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Json<Vec<String>> {
    match state.suggest.suggestions(&params.q).await {
        Ok(suggestions) => Json(suggestions),
        Err(err) => {
            warn!(query = %params.q, error = %err, "Autocomplete degraded to empty list");
            Json(Vec::new())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    pub keywords: Vec<String>,
}

/// Batched search-volume lookup. A fully failed batch maps to 500 with
/// a JSON error object; partial degradation still answers 200 with
/// zeros in place.
async fn search_volume_handler(
    State(state): State<AppState>,
    Json(request): Json<VolumeRequest>,
) -> Response {
    let report = state.interest.interest_scores(&request.keywords).await;

    if report.fully_degraded() {
        let cause = report
            .failures
            .values()
            .next()
            .map(ToString::to_string)
            .unwrap_or_else(|| "interest lookup failed".to_string());
        warn!(cause = %cause, "Search-volume batch fully degraded");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": cause})),
        )
            .into_response();
    }

    for (keyword, cause) in &report.failures {
        warn!(keyword = %keyword, cause = %cause, "Interest score degraded to 0");
    }
    Json(report.scores).into_response()
}

/// Health check endpoint.
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.sessions.session_count(),
    }))
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(chat_handler))
        .route("/autocomplete", get(autocomplete_handler))
        .route("/search-volume", post(search_volume_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
