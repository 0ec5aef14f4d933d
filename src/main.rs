//! Attendance Ingestion Service - Main Application Entry Point
//!
//! This is the scan-ingestion and session-lifecycle engine behind a
//! classroom attendance system. Barcode/QR scanners (ESP32-class devices)
//! push scans to it; it authenticates the device, matches the scan to the
//! single eligible live session, classifies present/late, records the
//! attendance exactly once, and pushes the outcome to connected dashboards.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server, WebSocket push channel)
//! - **Database**: PostgreSQL with sqlx (async queries, uniqueness-backed
//!   duplicate suppression)
//! - **Authentication**: per-device keys with SHA-256 hashing
//! - **Scheduling**: a background task drives the session state machine
//!   from wall-clock time, independent of any client
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Start the session lifecycle scheduler
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod broadcast;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod response;
mod scheduler;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // One broadcaster shared by handlers, the scheduler, and subscribers
    let broadcaster = broadcast::EventBroadcaster::new();

    let state = AppState {
        pool: pool.clone(),
        broadcaster: broadcaster.clone(),
        config: config.clone(),
    };

    // Server-owned lifecycle transitions: sessions go live and close on
    // time whether or not any client is watching
    scheduler::spawn(pool, broadcaster, config.scheduler_tick());

    // Scan ingestion, authenticated per device via X-Device-Key
    let scan_routes = Router::new()
        .route("/scans/ingest", post(handlers::scans::ingest))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::device_auth_middleware,
        ));

    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        // Dashboard push channel
        .route("/ws/events", get(handlers::events::subscribe))
        // Session lifecycle and read APIs
        .route(
            "/api/v1/sessions",
            post(handlers::sessions::create_session).get(handlers::sessions::list_sessions),
        )
        .route("/api/v1/sessions/{id}", get(handlers::sessions::get_session))
        .route(
            "/api/v1/sessions/{id}/status",
            put(handlers::sessions::force_status),
        )
        .route(
            "/api/v1/sessions/{id}/attendance",
            get(handlers::sessions::get_attendance),
        )
        .route(
            "/api/v1/sessions/{id}/absentees",
            get(handlers::sessions::get_absentees),
        )
        // Device registry
        .route(
            "/api/v1/devices",
            post(handlers::devices::create_device).get(handlers::devices::list_devices),
        )
        .route(
            "/api/v1/devices/{id}/rotate-key",
            post(handlers::devices::rotate_key),
        )
        // Student registration
        .route(
            "/api/v1/students",
            post(handlers::students::create_student).get(handlers::students::list_students),
        )
        // Merge device-authenticated routes
        .merge(scan_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Dashboards are browser clients on other origins
        .layer(CorsLayer::permissive())
        // Share state with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
