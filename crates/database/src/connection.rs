use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::{postgres::PgPoolOptions, Connection, PgPool};

/// Establishes a connection pool to the analytical database.
///
/// The credential travels inside `settings.url`. The pool is verified with a
/// ping round trip before it is handed out; if the ping fails the pool is
/// closed again so no half-open connections linger. The returned pool is a
/// cheap, cloneable handle shared by every request for the process lifetime.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, DbError> {
    if settings.url.trim().is_empty() {
        return Err(DbError::ConnectionConfigError(
            "DATABASE_URL must be set.".to_string(),
        ));
    }

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .connect(&settings.url)
        .await?;

    if let Err(e) = ping(&pool).await {
        tracing::error!(error = %e, "Database ping failed, closing pool.");
        pool.close().await;
        return Err(e);
    }

    tracing::info!(
        max_connections = settings.max_connections,
        "Connected to the analytical database."
    );
    Ok(pool)
}

/// A single liveness round trip on a pooled connection.
pub async fn ping(pool: &PgPool) -> Result<(), DbError> {
    let mut conn = pool.acquire().await?;
    conn.ping().await?;
    Ok(())
}

/// Gracefully closes the pool. Safe to call more than once.
pub async fn close(pool: &PgPool) {
    if pool.is_closed() {
        return;
    }
    pool.close().await;
    tracing::info!("Database pool closed.");
}
