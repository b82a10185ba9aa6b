use lonely_hangout::config::Config;
use lonely_hangout::persistence::{CatalogStore, JsonFileStore};
use lonely_hangout::ws::{Room, RoomOptions};
use lonely_hangout::{serve, AppState};
use std::panic;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Configuration is read before tracing so LOG_LEVEL can shape the filter
    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to the configured level, but allow debug for our app
            format!("lonely_hangout=debug,tower_http=debug,axum::rejection=trace,{}", config.log_level).into()
        }))
        .init();

    info!("Starting server...");
    match &loaded {
        Ok(_) => info!("✅ Configuration loaded successfully"),
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            warn!("Using default configuration");
        }
    }

    match &config.app_description {
        Some(path) => info!("App description: {}", path),
        None => warn!("No APP_DESCRIPTION configured"),
    }

    // Load the saved states; the room must not open with an unknown catalog
    let store = Arc::new(JsonFileStore::new(config.states_path()));
    let saved_states = match store.load().await {
        Ok(saved_states) => saved_states,
        Err(e) => {
            error!("Failed to load saved states: {}", e);
            std::process::exit(1);
        }
    };
    info!("💾 Saved states file: {}", store.path().display());

    let room = Room::new(saved_states, store, RoomOptions::from_config(&config));
    let state = AppState::new(room.clone(), config.clone());

    // Start the HTTP/WebSocket server
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/ws", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    if let Err(e) = serve(listener, state, shutdown_signal()).await {
        error!("Server error: {}", e);
    }

    // Give the last saved states write a chance to land
    if room.flush(config.shutdown_flush()).await {
        info!("Saved states are on disk");
    } else {
        warn!("Shut down before the latest saved states were written");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
