//! OSIS MPK Organization Backend
//!
//! REST backend for the organization website: public roster browsing and
//! aspiration submission, plus an authenticated admin surface with photo
//! uploads and a live change feed. SQLite is the source of truth; photos
//! live in a disk bucket served under /images.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod events;
mod models;
mod roster;
mod storage;
mod sync;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use events::ChangeFeed;
use storage::PhotoStore;

/// Change-feed buffer: slow subscribers past this many events are lagged.
const CHANGE_FEED_CAPACITY: usize = 64;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub photos: Arc<PhotoStore>,
    pub feed: ChangeFeed,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OSIS Organization Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Image bucket: {:?}", config.storage_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if no admin password is configured
    if config.admin_password.is_none() {
        tracing::warn!(
            "No admin password configured (OSIS_ADMIN_PASSWORD). Admin authentication is disabled!"
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize photo bucket
    let photos = Arc::new(PhotoStore::open(&config.storage_path).await?);

    // Create application state
    let state = AppState {
        repo,
        photos,
        feed: ChangeFeed::new(CHANGE_FEED_CAPACITY),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration: the public site is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone state for the session middleware
    let auth_state = state.clone();

    // Public routes: roster browsing, aspiration submission, sign-in
    let public_routes = Router::new()
        .route("/members", get(api::list_members))
        .route("/aspirations", post(api::create_aspiration))
        .route("/auth/login", post(api::login))
        .route("/auth/session", get(api::session_lookup));

    // Admin routes behind the session layer
    let admin_routes = Router::new()
        .route("/members", put(api::upsert_member))
        .route("/members/photo", post(api::upload_photo))
        .route("/members/{nba}", delete(api::delete_member))
        .route("/aspirations", get(api::list_aspirations))
        .route("/aspirations/{id}", delete(api::delete_aspiration))
        .route("/events", get(api::subscribe_changes))
        .route("/logout", post(api::logout))
        .layer(middleware::from_fn(move |req, next| {
            auth::session_auth_layer(auth_state.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", public_routes)
        .nest("/api/admin", admin_routes)
        .merge(health_routes)
        .nest_service("/images", ServeDir::new(state.photos.root()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
