use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod middleware;
pub mod repository;
pub mod service;
pub mod state;

use crate::cache::RedisCache;
use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopfront_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Shopfront server...");

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Environment: {:?}", config.environment);
    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool).await?;

    tracing::info!("Connecting to redis at {}...", config.redis_url);
    let cache = RedisCache::connect(&config.redis_url).await?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(pool.clone(), Arc::new(cache), config);

    lifecycle::startup_checks(&state).await?;

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(lifecycle::shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}
