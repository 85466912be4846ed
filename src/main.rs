use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use venue_recommender::{
    config::Config,
    db::{create_pool, create_redis_client, Cache},
    repositories::PgRepository,
    routes::{create_router, AppState},
    services::RecommendationEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }
    let repository = Arc::new(PgRepository::new(pool));

    let mut engine = RecommendationEngine::from_config(repository.clone(), repository, &config);

    let cache_writer = if config.profile_cache_enabled {
        let client = create_redis_client(&config.redis_url)?;
        let (cache, handle) = Cache::new(client).await;
        engine = engine.with_profile_cache(cache, config.profile_cache_ttl_secs);
        tracing::info!(ttl_secs = config.profile_cache_ttl_secs, "Profile cache enabled");
        Some(handle)
    } else {
        None
    };

    let addr = format!("{}:{}", config.host, config.port);
    let app = create_router(Arc::new(AppState::new(engine, config)));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
