//! Configuration system for Trendchat.
//!
//! Uses `figment` for layered configuration: defaults -> user config
//! file -> workspace config file -> environment. Configuration is
//! loaded from `~/.config/trendchat/config.toml` and/or
//! `.trendchat/config.toml` in the workspace directory, with
//! `TRENDCHAT_`-prefixed environment overrides
//! (e.g. `TRENDCHAT_LLM__MODEL`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the Trendchat server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub trends: TrendsConfig,
    pub suggest: SuggestConfig,
}

/// HTTP server bind configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name. Anything OpenAI-compatible works; "groq" is the default.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    pub base_url: Option<String>,
    /// Default temperature for generation.
    pub temperature: f32,
    /// Optional cap on generated tokens per response.
    pub max_tokens: Option<usize>,
    /// Request timeout in seconds for the completion stream.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "llama3-70b-8192".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            base_url: None,
            temperature: 0.7,
            max_tokens: None,
            timeout_secs: 120,
        }
    }
}

/// Search-interest (Google Trends) client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendsConfig {
    /// Base URL of the trends service.
    pub base_url: String,
    /// Interest window passed to the upstream query.
    pub timeframe: String,
    /// Optional geo scope (empty = worldwide).
    pub geo: String,
    /// Host language parameter.
    pub hl: String,
    /// Timezone offset in minutes, as the upstream API expects.
    pub tz: i32,
    /// Fixed delay before each batched query, to avoid upstream throttling.
    pub throttle_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://trends.google.com".to_string(),
            timeframe: "today 12-m".to_string(),
            geo: String::new(),
            hl: "en-US".to_string(),
            tz: 0,
            throttle_ms: 1000,
            timeout_secs: 10,
        }
    }
}

/// Autocomplete client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestConfig {
    /// Full URL of the suggestion endpoint.
    pub base_url: String,
    /// Client identifier parameter sent with each request.
    pub client: String,
    /// Browser-identifying User-Agent; the endpoint rejects non-browser requests.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://clients1.google.com/complete/search".to_string(),
            client: "psy-ab".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                .to_string(),
            timeout_secs: 10,
        }
    }
}

/// Load configuration with full layering: defaults, then user config
/// file, then workspace config file, then environment variables.
pub fn load_config(workspace: Option<&Path>) -> Result<AppConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "trendchat", "trendchat") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".trendchat").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (TRENDCHAT_LLM__MODEL, TRENDCHAT_SERVER__PORT, etc.)
    figment = figment.merge(Env::prefixed("TRENDCHAT_").split("__"));

    figment.extract().map_err(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "groq");
        assert_eq!(config.llm.model, "llama3-70b-8192");
        assert_eq!(config.llm.api_key_env, "GROQ_API_KEY");
        assert_eq!(config.trends.timeframe, "today 12-m");
        assert_eq!(config.server.port, 8000);
        assert!(config.trends.geo.is_empty());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.llm.model, config.llm.model);
        assert_eq!(deserialized.trends.throttle_ms, config.trends.throttle_ms);
        assert_eq!(deserialized.suggest.client, config.suggest.client);
    }

    #[test]
    fn test_workspace_config_merges() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".trendchat");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[llm]\nmodel = \"llama-3.1-8b-instant\"\n[server]\nport = 9000\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path())).unwrap();
        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
        assert_eq!(config.server.port, 9000);
        // Untouched sections keep their defaults
        assert_eq!(config.llm.provider, "groq");
    }
}
