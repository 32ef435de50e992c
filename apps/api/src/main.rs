mod config;
mod errors;
mod models;
mod routes;
mod session;
mod state;
mod webhook_client;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_router;
use crate::session::store::SessionStore;
use crate::session::workflow::WorkflowController;
use crate::state::AppState;
use crate::webhook_client::WebhookClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Assessment API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize webhook client
    let client = WebhookClient::new(&config.webhook)?;
    info!(
        "Webhook client initialized (base URL: {})",
        config.webhook.base_url
    );

    let controller = WorkflowController::new(Arc::new(client), config.form.clone());
    info!(
        "Accepting ages {}-{} and file types {:?}",
        config.form.min_age, config.form.max_age, config.form.supported_file_types
    );

    let sessions = SessionStore::new();
    sessions.spawn_sweeper(config.sessions);
    info!(
        "Idle sessions expire after {}s (swept every {}s)",
        config.sessions.idle_ttl.as_secs(),
        config.sessions.sweep_interval.as_secs()
    );

    let state = AppState {
        sessions,
        controller: Arc::new(controller),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
