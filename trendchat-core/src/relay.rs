//! The chat stream relay.
//!
//! Opens one streaming completion per exchange, forwards every incoming
//! fragment to the client the moment it arrives, and — once the
//! upstream stream ends — scans the accumulated response for the
//! keyword marker, resolves search-interest scores, and emits the
//! scores event followed by the terminal sentinel. Only after the
//! sentinel is the completed assistant turn appended to the
//! conversation, so a client can never observe the sentinel before the
//! full text.

use crate::config::LlmConfig;
use crate::keywords::extract_keywords;
use crate::providers::LlmProvider;
use crate::store::SharedConversation;
use crate::trends::InterestSource;
use crate::types::{CompletionRequest, Message, StreamEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Terminal sentinel payload signaling normal end-of-stream.
pub const END_SENTINEL: &str = "[END]";

/// Terminal payload signaling an aborted upstream stream.
pub const ERROR_SENTINEL: &str = "[ERROR]";

/// Prefix tag for the search-volume payload; the JSON object follows
/// immediately, with no delimiter.
pub const SEARCH_VOLUMES_TAG: &str = "SEARCH_VOLUMES";

/// Model-behavior instruction prepended to every exchange.
const SYSTEM_PROMPT: &str = "\
Always answer with a short informative sentence, followed by a list of \
comma-separated, specific, long-tail follow-up keywords. The keywords \
should be in the format [[keyword1, keyword2, keyword3, ...]] with \
double square brackets. After the keyword list, add a single line in \
the format icon: <name>, naming one lucide icon that fits the topic.";

/// One event emitted to the client during an exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// One incremental chunk of assistant text, in arrival order.
    Fragment(String),
    /// Keyword -> mean search-interest score for the completed response.
    SearchVolumes(BTreeMap<String, u64>),
    /// Normal end-of-stream sentinel.
    Done,
    /// The upstream stream failed; nothing was stored.
    Failed,
}

impl RelayEvent {
    /// The wire payload carried in the SSE `data:` field.
    pub fn sse_payload(&self) -> String {
        match self {
            RelayEvent::Fragment(text) => text.clone(),
            RelayEvent::SearchVolumes(scores) => {
                let json = serde_json::to_string(scores).unwrap_or_else(|_| "{}".to_string());
                format!("{}{}", SEARCH_VOLUMES_TAG, json)
            }
            RelayEvent::Done => END_SENTINEL.to_string(),
            RelayEvent::Failed => ERROR_SENTINEL.to_string(),
        }
    }
}

/// Orchestrates one streaming exchange end to end.
#[derive(Clone)]
pub struct ChatRelay {
    provider: Arc<dyn LlmProvider>,
    interest: Arc<dyn InterestSource>,
    temperature: f32,
    max_tokens: Option<usize>,
}

impl ChatRelay {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        interest: Arc<dyn InterestSource>,
        llm: &LlmConfig,
    ) -> Self {
        Self {
            provider,
            interest,
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
        }
    }

    /// Spawn one exchange and return its event stream.
    ///
    /// The conversation must already contain the new user turn.
    pub fn spawn(&self, conversation: SharedConversation) -> mpsc::Receiver<RelayEvent> {
        let (tx, rx) = mpsc::channel(64);
        let relay = self.clone();
        tokio::spawn(async move { relay.run(conversation, tx).await });
        rx
    }

    /// Run one exchange: stream fragments, then scores, then sentinel,
    /// then append the assistant turn — strictly in that order.
    pub async fn run(&self, conversation: SharedConversation, tx: mpsc::Sender<RelayEvent>) {
        let mut request = CompletionRequest {
            messages: vec![Message::system(SYSTEM_PROMPT)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        {
            let convo = conversation.lock().await;
            request.messages.extend(convo.turns().iter().cloned());
        }

        let (provider_tx, mut provider_rx) = mpsc::channel(64);
        let provider = Arc::clone(&self.provider);
        let upstream =
            tokio::spawn(async move { provider.complete_streaming(request, provider_tx).await });

        let mut accumulated = String::new();
        while let Some(event) = provider_rx.recv().await {
            match event {
                StreamEvent::Token(fragment) => {
                    if fragment.is_empty() {
                        continue;
                    }
                    accumulated.push_str(&fragment);
                    if tx.send(RelayEvent::Fragment(fragment)).await.is_err() {
                        // Client disconnected mid-stream; abandon the
                        // exchange without mutating the conversation.
                        upstream.abort();
                        return;
                    }
                }
                StreamEvent::Done => break,
            }
        }

        match upstream.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(error = %err, "Upstream completion stream failed");
                let _ = tx.send(RelayEvent::Failed).await;
                return;
            }
            Err(err) => {
                error!(error = %err, "Upstream streaming task aborted");
                let _ = tx.send(RelayEvent::Failed).await;
                return;
            }
        }

        let keywords = extract_keywords(&accumulated);
        if !keywords.is_empty() {
            let report = self.interest.interest_scores(&keywords).await;
            for (keyword, cause) in &report.failures {
                warn!(keyword = %keyword, cause = %cause, "Interest score degraded to 0");
            }
            if tx.send(RelayEvent::SearchVolumes(report.scores)).await.is_err() {
                return;
            }
        }

        if tx.send(RelayEvent::Done).await.is_err() {
            return;
        }

        // Only after the sentinel: the client has seen the full text.
        conversation
            .lock()
            .await
            .push(Message::assistant(accumulated));
    }
}
