//! Database bootstrap - SQLite pool and embedded migrations

use crate::core::Config;
use sqlx::SqlitePool;
use sqlx::migrate::MigrateError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, instrument};

/// Open the pool described by the configuration. Foreign keys are enforced on every connection.
#[instrument(skip(config), fields(max_connections = config.max_connections))]
pub async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;
    info!("Database pool ready");
    Ok(pool)
}

/// Apply the migrations embedded from `./migrations`
pub async fn migrate(pool: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    async fn test_migrate_twice_is_a_noop(pool: SqlitePool) -> sqlx::Result<()> {
        migrate(&pool).await?;
        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'tasks')",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(tables, 2);
        Ok(())
    }
}
