//! OpenAI-compatible LLM provider.
//!
//! Supports Groq, OpenAI, and any endpoint that follows the OpenAI
//! chat-completions API format. Streaming consumes the SSE body
//! incrementally so fragments reach the caller the moment they arrive.

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::providers::LlmProvider;
use crate::types::{CompletionRequest, Message, Role, StreamEvent};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default endpoint for the default provider (Groq's OpenAI-compatible API).
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// OpenAI-compatible streaming chat-completions client.
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider with an explicitly provided API key.
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ApiRequest {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
        })
    }

    /// Convert internal messages to OpenAI JSON format.
    fn messages_to_json(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                };
                json!({ "role": role, "content": msg.content })
            })
            .collect()
    }

    /// Parse a single SSE data line. Returns the parsed JSON if valid.
    fn parse_sse_line(line: &str) -> Option<Value> {
        let data = line.strip_prefix("data: ")?;
        if data == "[DONE]" {
            return None;
        }
        serde_json::from_str(data).ok()
    }

    /// Extract the text delta from one streamed chunk, if any.
    fn delta_content(data: &Value) -> Option<String> {
        data.get("choices")?
            .get(0)?
            .get("delta")?
            .get("content")?
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Map an HTTP status code to the appropriate LlmError.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 => {
                debug!(body = %body, "Authentication failed (401)");
                LlmError::AuthFailed {
                    provider: "OpenAI-compatible".to_string(),
                }
            }
            429 => {
                // Try to parse "try again in Xs" from the error message
                let retry_secs = serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")?
                            .get("message")?
                            .as_str()
                            .map(|s| s.to_string())
                    })
                    .and_then(|msg| {
                        msg.split("in ")
                            .last()
                            .and_then(|s| s.trim_end_matches('s').parse::<u64>().ok())
                    })
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            status if status >= 500 => LlmError::ApiRequest {
                message: format!("Server error ({}): {}", status, body),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {}: {}", status, body),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete_streaming(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = json!({
            "model": self.model,
            "messages": Self::messages_to_json(&request.messages),
            "temperature": request.temperature,
            "stream": true,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        debug!(url = %url, model = %self.model, "Opening streaming completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Streaming {
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        // Stream SSE events incrementally using bytes_stream.
        let mut byte_stream = response.bytes_stream();
        let mut line_buffer = String::new();

        'outer: while let Some(chunk_result) = byte_stream.next().await {
            let chunk = chunk_result.map_err(|e| LlmError::Streaming {
                message: format!("Failed to read streaming chunk: {}", e),
            })?;

            line_buffer.push_str(&String::from_utf8_lossy(&chunk));

            // Process complete lines from the buffer.
            while let Some(newline_pos) = line_buffer.find('\n') {
                let line = line_buffer[..newline_pos].trim().to_string();
                line_buffer = line_buffer[newline_pos + 1..].to_string();

                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                if line == "data: [DONE]" {
                    break 'outer;
                }

                match Self::parse_sse_line(&line) {
                    Some(data) => {
                        if let Some(content) = Self::delta_content(&data)
                            && tx.send(StreamEvent::Token(content)).await.is_err()
                        {
                            // Receiver gone; stop consuming the upstream.
                            return Ok(());
                        }
                    }
                    None => {
                        warn!(line = %line, "Skipping unparseable SSE line");
                    }
                }
            }
        }

        let _ = tx.send(StreamEvent::Done).await;
        Ok(())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_messages_to_json() {
        let messages = vec![
            Message::system("be brief"),
            Message::user("hello"),
            Message::assistant("hi"),
        ];
        let json_msgs = OpenAiCompatibleProvider::messages_to_json(&messages);
        assert_eq!(json_msgs.len(), 3);
        assert_eq!(json_msgs[0]["role"], "system");
        assert_eq!(json_msgs[0]["content"], "be brief");
        assert_eq!(json_msgs[1]["role"], "user");
        assert_eq!(json_msgs[2]["role"], "assistant");
    }

    #[test]
    fn test_parse_sse_line() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        let parsed = OpenAiCompatibleProvider::parse_sse_line(line).unwrap();
        assert_eq!(
            OpenAiCompatibleProvider::delta_content(&parsed).as_deref(),
            Some("Hel")
        );

        assert!(OpenAiCompatibleProvider::parse_sse_line("data: [DONE]").is_none());
        assert!(OpenAiCompatibleProvider::parse_sse_line("event: ping").is_none());
        assert!(OpenAiCompatibleProvider::parse_sse_line("data: not json").is_none());
    }

    #[test]
    fn test_delta_content_empty_fragment_skipped() {
        let data: Value =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert!(OpenAiCompatibleProvider::delta_content(&data).is_none());

        // Role-only delta (first chunk) carries no content
        let data: Value = serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#)
            .unwrap();
        assert!(OpenAiCompatibleProvider::delta_content(&data).is_none());
    }

    #[test]
    fn test_map_http_error() {
        let err = OpenAiCompatibleProvider::map_http_error(
            reqwest::StatusCode::UNAUTHORIZED,
            "bad key",
        );
        assert!(matches!(err, LlmError::AuthFailed { .. }));

        let err = OpenAiCompatibleProvider::map_http_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"Rate limit reached, try again in 30s"}}"#,
        );
        assert!(matches!(
            err,
            LlmError::RateLimited {
                retry_after_secs: 30
            }
        ));

        let err = OpenAiCompatibleProvider::map_http_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
        );
        assert!(matches!(err, LlmError::ApiRequest { .. }));
    }
}
