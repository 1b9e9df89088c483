//! Path Entry Service - entry form sessions over HTTP
//!
//! Serves the path entry editor: opening a form for a new or existing entry,
//! geocoding between its address and coordinates, and submitting it to the
//! path store.

mod config;
mod error;
mod server;

use std::path::Path;
use std::sync::Arc;

use google_geocoding_client::GoogleGeocodingClient;
use path_entry::{Entry, InMemoryPathStore};
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::Config;
use crate::error::{Result, ServerError};
use crate::server::{start_server, ServerState, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("path_entry_server=info".parse()?)
        .add_directive("path_entry=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Path Entry Service...");

    let config = Config::from_env();
    info!("Port: {}", config.port);
    let tz = config.tz();
    if tz.name() != config.timezone.trim() {
        warn!("Unknown ENTRY_TIMEZONE {:?}, using {}", config.timezone, tz.name());
    }
    info!("Entry time zone: {}", tz.name());
    if config.google_places_key.is_none() {
        info!("GOOGLE_PLACES_KEY not set, geocoding requests are unauthenticated");
    }

    let entries = match config.seed_file {
        Some(ref path) => load_seed(path).await?,
        None => Vec::new(),
    };
    info!("Loaded {} path entries", entries.len());

    let geocoder = GoogleGeocodingClient::with_options(config.geocoding_options())?;
    let store = InMemoryPathStore::with_entries(entries);

    let state: SharedState = Arc::new(ServerState::new(
        Arc::new(store),
        Arc::new(geocoder),
        tz,
    ));

    // Start HTTP server (blocking)
    start_server(state, config.port, &config.cors_origins)
        .await
        .map_err(|e| ServerError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

async fn load_seed(path: &Path) -> Result<Vec<Entry>> {
    let raw = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&raw)?)
}
