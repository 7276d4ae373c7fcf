mod analysis;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::{AnalysisClient, RetryPolicy};
use crate::config::Config;
use crate::extraction::PdfTextExtractor;
use crate::llm_client::{GeminiClient, GeminiConfig};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // A missing key is reported per request, not here.
    let analyzer = match &config.gemini_api_key {
        Some(api_key) => {
            let gemini = GeminiClient::new(GeminiConfig {
                api_key: api_key.clone(),
                model: config.gemini_model.clone(),
                base_url: config.gemini_base_url.clone(),
            })?;
            info!("Gemini client initialized (model: {})", gemini.model());
            Some(Arc::new(AnalysisClient::new(
                Arc::new(gemini),
                RetryPolicy::default(),
            )))
        }
        None => {
            warn!("GEMINI_API_KEY is not set; /analyze will reject requests until it is configured");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        extractor: Arc::new(PdfTextExtractor),
        analyzer,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on CTRL+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install CTRL+C signal handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received CTRL+C signal, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM signal, initiating graceful shutdown..."),
    }
}
