//! Trendchat server — streams LLM chat over SSE and annotates answers
//! with Google Trends interest scores.

mod routes;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use trendchat_core::providers::create_provider;
use trendchat_core::suggest::SuggestClient;
use trendchat_core::trends::GoogleTrendsClient;

/// Trendchat: chat relay with live search-interest annotations
#[derive(Parser, Debug)]
#[command(name = "trendchat", version, about, long_about = None)]
struct Cli {
    /// Bind address (overrides configuration)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides configuration)
    #[arg(short, long)]
    port: Option<u16>,

    /// Workspace directory searched for .trendchat/config.toml
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "trendchat", "trendchat")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "trendchat.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut config = trendchat_core::config::load_config(Some(&workspace))
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let provider = create_provider(&config.llm)?;
    info!(model = %provider.model_name(), "LLM provider ready");

    let trends = Arc::new(GoogleTrendsClient::new(&config.trends)?);
    let suggest = SuggestClient::new(&config.suggest)?;
    let state = routes::AppState::new(provider, trends, suggest, &config.llm);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Trendchat listening");

    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
