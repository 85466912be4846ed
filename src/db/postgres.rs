use sqlx::{postgres::PgPoolOptions, PgPool};

const MAX_CONNECTIONS: u32 = 10;

/// Creates the PostgreSQL connection pool shared by all repositories
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await?;

    tracing::info!(max_connections = MAX_CONNECTIONS, "Connected to PostgreSQL");

    Ok(pool)
}
