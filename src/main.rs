use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dbe_tracker_server::{AppState, Config, build_router, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dbe_tracker_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = db::init_db_pool(
        &config.database_url,
        config.max_pool_size,
        config.pool_acquire_timeout,
    )
    .await
    .context("Failed to initialize database")?;
    tracing::info!("Database initialized at {}", config.database_url);

    let state = Arc::new(AppState::new(pool, &config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.server_addr()))?;
    tracing::info!("Listening on {}", config.server_addr());

    axum::serve(listener, app).await?;
    Ok(())
}
