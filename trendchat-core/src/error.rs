//! Error types for the Trendchat core library.
//!
//! Uses `thiserror` for structured error variants covering the LLM,
//! search-interest, and autocomplete domains. Fetcher errors are
//! classified rather than swallowed: callers receive the tag and decide
//! how to degrade (zero scores, empty suggestion list).

/// Top-level error type for the Trendchat core library.
#[derive(Debug, thiserror::Error)]
pub enum TrendchatError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search-interest error: {0}")]
    Trends(#[from] TrendsError),

    #[error("Autocomplete error: {0}")]
    Suggest(#[from] SuggestError),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Streaming error: {message}")]
    Streaming { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// Classified failures from the search-interest fetcher.
///
/// Every variant degrades the affected keyword's score to 0; the tag
/// survives in the [`crate::trends::VolumeReport`] so the caller can
/// log transient vs. permanent causes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrendsError {
    #[error("Request timed out")]
    Timeout,

    #[error("Upstream returned HTTP {code}")]
    Status { code: u16 },

    #[error("Malformed upstream response: {message}")]
    Parse { message: String },

    #[error("No interest series returned for keyword")]
    MissingSeries,

    #[error("Connection failed: {message}")]
    Connection { message: String },
}

/// Classified failures from the autocomplete fetcher.
#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("Request failed: {message}")]
    Request { message: String },

    #[error("Upstream returned HTTP {code}")]
    Status { code: u16 },

    #[error("Malformed suggestion payload: {message}")]
    Parse { message: String },
}
