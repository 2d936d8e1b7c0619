//! Autocomplete fetcher for the chat input field.
//!
//! Queries a public suggestion endpoint with a browser-identifying
//! User-Agent (the endpoint rejects non-browser requests) and decodes
//! its quirky response: a short anti-JSON prefix followed by a nested
//! array whose first element is the ranked suggestion list, each entry
//! an array whose first element is the display text.

use crate::config::SuggestConfig;
use crate::error::SuggestError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Client for the third-party suggestion endpoint.
#[derive(Clone)]
pub struct SuggestClient {
    client: Client,
    config: SuggestConfig,
}

impl SuggestClient {
    pub fn new(config: &SuggestConfig) -> Result<Self, SuggestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| SuggestError::Request {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Fetch ranked suggestions for a partial query.
    ///
    /// Upstream ranking order is preserved and nothing is deduplicated.
    /// Failures come back tagged; callers that need the original
    /// degrade-to-empty behavior map any error to `[]`.
    pub async fn suggestions(&self, query: &str) -> Result<Vec<String>, SuggestError> {
        // Cursor position parameter, derived from the query length.
        let cp = query.chars().count().to_string();

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("client", self.config.client.as_str()),
                ("q", query),
                ("cp", &cp),
            ])
            .send()
            .await
            .map_err(|e| SuggestError::Request {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SuggestError::Status {
                code: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| SuggestError::Request {
            message: e.to_string(),
        })?;

        let suggestions = parse_suggest_body(&body)?;
        debug!(query = %query, count = suggestions.len(), "Fetched suggestions");
        Ok(suggestions)
    }
}

/// Strip the anti-JSON prefix and pull display texts out of the nested
/// suggestion payload.
fn parse_suggest_body(body: &str) -> Result<Vec<String>, SuggestError> {
    // The printable prefix is the 4 bytes `)]}'`, sometimes followed by
    // a newline; scanning to the first bracket handles both forms.
    let start = body.find(['[', '{']).ok_or_else(|| SuggestError::Parse {
        message: "no JSON payload after prefix".to_string(),
    })?;
    let value: Value =
        serde_json::from_str(&body[start..]).map_err(|e| SuggestError::Parse {
            message: e.to_string(),
        })?;

    let entries = value
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| SuggestError::Parse {
            message: "payload has no suggestion list".to_string(),
        })?;

    Ok(entries
        .iter()
        .filter_map(|entry| entry.get(0).and_then(|t| t.as_str()).map(str::to_string))
        .collect())
}
