mod config;
mod errors;
mod evaluation;
mod llm_client;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::evaluation::service::{EvaluationService, RetryPolicy};
use crate::llm_client::{GeminiClient, ModelClient};
use crate::routes::build_router;
use crate::session::SessionStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Analyzer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize model client
    let model = GeminiClient::new(
        config.gemini_api_base.clone(),
        config.gemini_model.clone(),
        config.gemini_api_key.clone(),
        config.model_timeout,
    )?;
    info!(
        "Model client initialized (model: {}, timeout: {:?})",
        model.model(),
        config.model_timeout
    );

    let evaluator = EvaluationService::new(
        Arc::new(model),
        RetryPolicy {
            max_attempts: config.model_max_attempts,
            base_delay: config.model_retry_base,
        },
        config.batch_concurrency,
    );
    info!(
        "Evaluation service ready (attempts: {}, batch concurrency: {})",
        config.model_max_attempts, config.batch_concurrency
    );

    // Cancelled on shutdown so in-flight batches stop promptly
    let shutdown = CancellationToken::new();

    let state = AppState {
        evaluator: Arc::new(evaluator),
        sessions: SessionStore::new(shutdown.clone()),
    };

    let app = build_router(state, config.max_upload_bytes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, cancelling in-flight batches");
    shutdown.cancel();
}
