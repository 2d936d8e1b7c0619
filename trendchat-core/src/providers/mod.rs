//! LLM provider implementations.
//!
//! Provides the `LlmProvider` trait and a concrete client for
//! OpenAI-compatible chat-completions APIs (Groq, OpenAI, and any
//! endpoint following the same format). Use [`create_provider`] to
//! instantiate the provider configured in [`LlmConfig`].

pub mod openai_compat;

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::{CompletionRequest, StreamEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

pub use openai_compat::OpenAiCompatibleProvider;

/// Interface to an LLM completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a streaming completion, sending events to the channel.
    ///
    /// Every non-empty text fragment is sent as [`StreamEvent::Token`]
    /// in arrival order; a final [`StreamEvent::Done`] marks normal
    /// termination. Transport and protocol failures are returned as an
    /// error instead of a `Done` event.
    async fn complete_streaming(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), LlmError>;

    /// Return the model name this provider targets.
    fn model_name(&self) -> &str;
}

/// Resolve the API key from the environment variable named in config.
pub fn resolve_api_key(config: &LlmConfig) -> Result<String, LlmError> {
    std::env::var(&config.api_key_env).map_err(|_| LlmError::AuthFailed {
        provider: format!("env var '{}' not set", config.api_key_env),
    })
}

/// Create an LLM provider based on the configuration.
///
/// Every supported provider speaks the OpenAI chat-completions format;
/// the provider name only selects the default base URL.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let api_key = resolve_api_key(config)?;
    Ok(Arc::new(OpenAiCompatibleProvider::new_with_key(
        config, api_key,
    )?))
}
