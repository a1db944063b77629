mod config;
mod errors;
mod llm_client;
mod resume;
mod routes;
mod session;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ResumeCopilot v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client (one provider per kind, default from INFERENCE_PROVIDER)
    let llm = LlmClient::from_config(&config)?;
    let default_kind = llm.default_kind();
    info!(
        "LLM client initialized (provider: {}, model: {})",
        default_kind,
        llm.model(default_kind).unwrap_or("unknown")
    );

    let state = AppState::new(config.clone(), llm);
    info!(
        "Session TTL {}s, prompt limit {} chars, upload limit {} bytes",
        config.session_ttl.as_secs(),
        config.max_prompt_chars,
        config.max_upload_bytes
    );

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the form is served from a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
