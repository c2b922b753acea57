mod config;
mod db;
mod errors;
mod feedback;
mod finalize;
mod form;
mod generation;
mod llm_client;
mod models;
mod routes;
mod session;
mod state;
mod store;
mod transcript;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::form::extract::PdfResumeExtractor;
use crate::form::HttpGenerationGateway;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::session::events::EventHub;
use crate::session::runtime::{SessionLimits, SessionRuntime};
use crate::session::vapi::VapiClient;
use crate::state::AppState;
use crate::store::PgDocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL document store
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgDocumentStore::new(db));

    // Initialize LLM client
    let model = Arc::new(LlmClient::new(config.google_api_key.clone())?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Vendor webhook events fan out to call sessions through the hub
    let events = EventHub::default();
    let voice = Arc::new(VapiClient::new(
        config.vapi_api_key.clone(),
        config.vapi_base_url.clone(),
        events.clone(),
    )?);
    info!("Voice agent initialized ({})", config.vapi_base_url);

    let sessions = SessionRuntime::new(
        voice,
        model.clone(),
        store.clone(),
        config.vapi_workflow_id.clone(),
    )
    .with_limits(SessionLimits {
        max_sessions: config.max_sessions,
        session_timeout: Duration::from_secs(config.session_timeout_secs),
        ..SessionLimits::default()
    });
    let cleanup_shutdown = sessions.start_cleanup_task();
    info!(
        "Session limits: {} sessions, {}s idle timeout",
        config.max_sessions, config.session_timeout_secs
    );

    let generation_gateway = Arc::new(HttpGenerationGateway::new(config.generate_url())?);
    info!("Form submissions post to {}", config.generate_url());

    // Build app state
    let state = AppState {
        config: config.clone(),
        store,
        model,
        events,
        sessions,
        resume_extractor: Arc::new(PdfResumeExtractor),
        generation_gateway,
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    let _ = cleanup_shutdown.send(true);

    Ok(())
}
