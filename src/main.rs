//! Filmoteka - a conversational personal film catalog
//!
//! Users search an external movie database, keep per-profile film lists,
//! and rate, comment on and mark films watched, one chat action at a time.

mod api;
mod catalog;
mod config;
mod conversation;
mod runtime;
mod store;

use api::{create_router, AppState};
use catalog::{CatalogClient, KinopoiskService};
use config::AppConfig;
use runtime::{SessionManager, SessionSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use store::FilmStore;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filmoteka=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize store
    tracing::info!(path = %config.db_path.display(), "Opening film store");
    let store = FilmStore::open(&config.db_path)?;

    // Initialize catalog
    if config.kinopoisk_api_key.is_none() {
        tracing::warn!("KINOPOISK_API_KEY is not set. Film searches will report the catalog as unavailable.");
    }
    let service = KinopoiskService::new(
        config.kinopoisk_api_key.clone(),
        &config.kinopoisk_api_url,
        config.catalog_timeout,
    )?;
    let catalog = CatalogClient::new(Arc::new(service), config.catalog_timeout);
    tracing::info!(
        base_url = %config.kinopoisk_api_url,
        timeout_secs = config.catalog_timeout.as_secs(),
        "Catalog client initialized"
    );

    // Create application state
    let sessions = SessionManager::new(
        store,
        catalog,
        SessionSettings {
            profiles: config.profiles.clone(),
            search_limit: config.search_limit,
            idle_timeout: config.session_idle_timeout,
        },
    );
    let state = AppState::new(sessions);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(profiles = ?config.profiles, "Filmoteka listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
