//! Trendchat core — conversation state, LLM streaming, and the
//! auxiliary keyword / search-interest / autocomplete integrations.
//!
//! The heart of the crate is [`relay::ChatRelay`], which streams a
//! completion to the client fragment by fragment and enriches the
//! finished response with search-interest scores. Everything external
//! sits behind a trait seam ([`providers::LlmProvider`],
//! [`trends::InterestSource`]) so the server and tests can swap
//! implementations.

pub mod config;
pub mod error;
pub mod keywords;
pub mod providers;
pub mod relay;
pub mod store;
pub mod suggest;
pub mod trends;
pub mod types;

pub use config::AppConfig;
pub use error::TrendchatError;
pub use relay::{ChatRelay, RelayEvent};
pub use store::SessionStore;
