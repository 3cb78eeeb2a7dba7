//! Startup checks and graceful shutdown

use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::cache::Cache;
use crate::db;
use crate::state::AppState;

/// Make sure the database and Redis answer before accepting traffic
pub async fn startup_checks(state: &AppState) -> anyhow::Result<()> {
    if let Err(e) = db::ping(&state.pool).await {
        tracing::error!("CRITICAL: database is unreachable: {}", e);
        return Err(e.into());
    }
    tracing::info!("Database connection verified");

    if let Err(e) = check_cache(state.cache.as_ref()).await {
        tracing::error!("CRITICAL: redis is unreachable: {}", e);
        return Err(e);
    }
    tracing::info!("Redis connection verified");

    Ok(())
}

async fn check_cache(cache: &dyn Cache) -> anyhow::Result<()> {
    cache.ping().await?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryCache;

    #[tokio::test]
    async fn test_cache_check() {
        let cache = MemoryCache::new();
        check_cache(&cache).await.unwrap();
    }
}
